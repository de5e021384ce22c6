//! Compact binary resource identifier codec
//!
//! Every resource the service hands out carries a `_rid`: a base64 string
//! (with `/` replaced by `-` so it can appear in links) that decodes to a
//! fixed-width little-endian buffer:
//!
//! ```text
//! bytes  0..4   database     (u32)
//! bytes  4..8   collection   (u32, marker bit 0x80 set in byte 4)
//!               or user      (u32, marker bit clear)
//! bytes  8..16  document / sproc / trigger / udf / conflict (u64) under a collection
//!               or permission (u64) under a user
//! bytes 16..20  attachment   (u32)
//! ```
//!
//! The session layer keys its tables by [`ResourceId::unique_collection_id`],
//! so a document id and the id of its owning collection map to the same key.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use std::fmt;

use crate::error::{DocDbError, DocDbResult};

/// Standard alphabet, padding optional on decode, emitted on encode.
const RID_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const DATABASE_LEN: usize = 4;
const COLLECTION_LEN: usize = 8;
const CHILD_LEN: usize = 16;
const ATTACHMENT_LEN: usize = 20;

/// Marker bit distinguishing a collection component from a user component.
const COLLECTION_MARKER: u8 = 0x80;

/// Decoded resource identifier
///
/// Two identifiers are equal iff their decoded bytes are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId {
    database: u32,
    collection: u32,
    user: u32,
    child: u64,
    attachment: u32,
    len: usize,
}

impl ResourceId {
    /// Decode a textual resource id
    ///
    /// # Errors
    ///
    /// Returns `InvalidResourceId` if the text is not base64 or does not decode
    /// to one of the valid widths (4, 8, 16 or 20 bytes).
    pub fn parse(text: &str) -> DocDbResult<Self> {
        if text.is_empty() {
            return Err(DocDbError::invalid_resource_id(text, "empty resource id"));
        }
        let bytes = decode_text(text)
            .map_err(|e| DocDbError::invalid_resource_id(text, format!("not base64: {}", e)))?;
        Self::from_bytes(&bytes).map_err(|e| match e {
            DocDbError::InvalidResourceId { reason, .. } => {
                DocDbError::invalid_resource_id(text, reason)
            }
            other => other,
        })
    }

    /// Decode a textual resource id, returning `None` on any failure
    pub fn try_parse(text: &str) -> Option<Self> {
        Self::parse(text).ok()
    }

    /// Build an identifier from its decoded bytes
    ///
    /// # Errors
    ///
    /// Returns `InvalidResourceId` for unsupported widths.
    pub fn from_bytes(bytes: &[u8]) -> DocDbResult<Self> {
        if !matches!(
            bytes.len(),
            DATABASE_LEN | COLLECTION_LEN | CHILD_LEN | ATTACHMENT_LEN
        ) {
            return Err(DocDbError::invalid_resource_id(
                format!("{:02x?}", bytes),
                format!("unsupported length {}", bytes.len()),
            ));
        }

        let mut rid = ResourceId {
            database: read_u32(bytes, 0),
            collection: 0,
            user: 0,
            child: 0,
            attachment: 0,
            len: bytes.len(),
        };

        if bytes.len() >= COLLECTION_LEN {
            let component = read_u32(bytes, 4);
            if bytes[4] & COLLECTION_MARKER != 0 {
                rid.collection = component;
            } else {
                rid.user = component;
            }
        }
        if bytes.len() >= CHILD_LEN {
            rid.child = read_u64(bytes, 8);
        }
        if bytes.len() >= ATTACHMENT_LEN {
            rid.attachment = read_u32(bytes, 16);
        }

        Ok(rid)
    }

    /// Identifier of a database
    pub fn new_database(database: u32) -> Self {
        ResourceId {
            database,
            collection: 0,
            user: 0,
            child: 0,
            attachment: 0,
            len: DATABASE_LEN,
        }
    }

    /// Identifier of a collection
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `collection` lacks the collection marker bit
    /// (`0x80` in its low byte); without it the id would decode as a user.
    pub fn new_collection(database: u32, collection: u32) -> DocDbResult<Self> {
        if collection.to_le_bytes()[0] & COLLECTION_MARKER == 0 {
            return Err(DocDbError::invalid_input(format!(
                "collection component {:#x} lacks the collection marker bit",
                collection
            )));
        }
        Ok(ResourceId {
            collection,
            len: COLLECTION_LEN,
            ..Self::new_database(database)
        })
    }

    /// Identifier of a document (or other collection child)
    pub fn new_document(database: u32, collection: u32, document: u64) -> DocDbResult<Self> {
        let parent = Self::new_collection(database, collection)?;
        Ok(ResourceId {
            child: document,
            len: CHILD_LEN,
            ..parent
        })
    }

    /// Database component
    pub fn database(&self) -> u32 {
        self.database
    }

    /// Collection component, `0` when the id is not collection-scoped
    pub fn collection(&self) -> u32 {
        self.collection
    }

    /// User component, `0` when the id is not user-scoped
    pub fn user(&self) -> u32 {
        self.user
    }

    /// Document (or sproc/trigger/udf/conflict) component under a collection
    pub fn document(&self) -> u64 {
        if self.collection != 0 {
            self.child
        } else {
            0
        }
    }

    /// Permission component under a user
    pub fn permission(&self) -> u64 {
        if self.user != 0 {
            self.child
        } else {
            0
        }
    }

    /// Attachment component
    pub fn attachment(&self) -> u32 {
        self.attachment
    }

    /// True when the id names a collection or something inside one
    pub fn is_collection_scoped(&self) -> bool {
        self.collection != 0
    }

    /// Key identifying the owning collection across the whole account
    ///
    /// Database in the high 32 bits, collection in the low 32 bits.
    pub fn unique_collection_id(&self) -> u64 {
        (u64::from(self.database) << 32) | u64::from(self.collection)
    }

    /// Id of the owning collection (`None` if not collection-scoped)
    pub fn collection_id(&self) -> Option<ResourceId> {
        if self.collection == 0 {
            return None;
        }
        Some(ResourceId {
            database: self.database,
            collection: self.collection,
            user: 0,
            child: 0,
            attachment: 0,
            len: COLLECTION_LEN,
        })
    }

    /// Decoded bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len);
        bytes.extend_from_slice(&self.database.to_le_bytes());
        if self.len >= COLLECTION_LEN {
            let component = if self.collection != 0 {
                self.collection
            } else {
                self.user
            };
            bytes.extend_from_slice(&component.to_le_bytes());
        }
        if self.len >= CHILD_LEN {
            bytes.extend_from_slice(&self.child.to_le_bytes());
        }
        if self.len >= ATTACHMENT_LEN {
            bytes.extend_from_slice(&self.attachment.to_le_bytes());
        }
        bytes
    }

    /// Textual (link-safe) form
    pub fn to_text(&self) -> String {
        RID_ENGINE.encode(self.to_bytes()).replace('/', "-")
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Decode the link-safe textual form into raw bytes
pub fn decode_text(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    RID_ENGINE.decode(text.replace('-', "/"))
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}
