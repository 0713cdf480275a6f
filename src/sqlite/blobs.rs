use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::engine::{EngineBlobId, SegmentStream};
use crate::error::SqlMarshalError;
use crate::types::BlobSubtype;

/// Chunk size used when streaming a fetched TEXT blob back to the caller.
pub(super) const TEXT_READ_CHUNK: usize = 16 * 1024;

enum StoredBlob {
    /// Receiving segments; not yet bindable.
    Open {
        subtype: BlobSubtype,
        segment_size: usize,
        content: Vec<u8>,
    },
    /// Written and closed; bindable and readable until the transaction ends.
    Closed {
        subtype: BlobSubtype,
        segment_size: usize,
        content: Arc<Vec<u8>>,
    },
    /// Produced by a query; released once the reader closes it.
    Fetched {
        subtype: BlobSubtype,
        segment_size: usize,
        content: Arc<Vec<u8>>,
    },
}

/// Per-connection staging area for blob content.
///
/// SQLite has no blob handles of its own outside of a row, so blobs written through
/// the channel are assembled here and bound by reference when the statement runs.
#[derive(Default)]
pub(super) struct BlobStore {
    next_id: u64,
    entries: HashMap<u64, StoredBlob>,
}

impl BlobStore {
    pub(super) fn create(&mut self, subtype: BlobSubtype, segment_size: usize) -> EngineBlobId {
        let id = self.allocate();
        self.entries.insert(
            id,
            StoredBlob::Open {
                subtype,
                segment_size,
                content: Vec::new(),
            },
        );
        EngineBlobId(id)
    }

    pub(super) fn append(&mut self, id: EngineBlobId, bytes: &[u8]) -> Result<(), SqlMarshalError> {
        match self.entries.get_mut(&id.0) {
            Some(StoredBlob::Open {
                segment_size,
                content,
                ..
            }) => {
                if bytes.len() > *segment_size {
                    return Err(SqlMarshalError::ExecutionError(format!(
                        "segment of {} bytes exceeds the {segment_size}-byte segment size of {id}",
                        bytes.len()
                    )));
                }
                content.extend_from_slice(bytes);
                Ok(())
            }
            Some(_) => Err(SqlMarshalError::ExecutionError(format!(
                "{id} is not open for writing"
            ))),
            None => Err(unknown(id)),
        }
    }

    pub(super) fn close(&mut self, id: EngineBlobId) -> Result<(), SqlMarshalError> {
        match self.entries.remove(&id.0) {
            Some(StoredBlob::Open {
                subtype,
                segment_size,
                content,
            }) => {
                self.entries.insert(
                    id.0,
                    StoredBlob::Closed {
                        subtype,
                        segment_size,
                        content: Arc::new(content),
                    },
                );
                Ok(())
            }
            Some(closed @ StoredBlob::Closed { .. }) => {
                self.entries.insert(id.0, closed);
                Ok(())
            }
            Some(StoredBlob::Fetched { .. }) => Ok(()),
            None => Err(unknown(id)),
        }
    }

    pub(super) fn cancel(&mut self, id: EngineBlobId) {
        self.entries.remove(&id.0);
    }

    pub(super) fn register_fetched(
        &mut self,
        subtype: BlobSubtype,
        segment_size: usize,
        content: Vec<u8>,
    ) -> EngineBlobId {
        let id = self.allocate();
        self.entries.insert(
            id,
            StoredBlob::Fetched {
                subtype,
                segment_size,
                content: Arc::new(content),
            },
        );
        EngineBlobId(id)
    }

    /// Shared content of a closed blob, for binding without a copy.
    pub(super) fn shared(&self, id: EngineBlobId) -> Result<Arc<Vec<u8>>, SqlMarshalError> {
        match self.entries.get(&id.0) {
            Some(
                StoredBlob::Closed { content, .. } | StoredBlob::Fetched { content, .. },
            ) => Ok(Arc::clone(content)),
            Some(StoredBlob::Open { .. }) => Err(SqlMarshalError::ExecutionError(format!(
                "{id} is still open and cannot be bound"
            ))),
            None => Err(unknown(id)),
        }
    }

    pub(super) fn stream(&self, id: EngineBlobId) -> Result<Box<dyn SegmentStream>, SqlMarshalError> {
        match self.entries.get(&id.0) {
            Some(
                StoredBlob::Closed {
                    subtype,
                    segment_size,
                    content,
                }
                | StoredBlob::Fetched {
                    subtype,
                    segment_size,
                    content,
                },
            ) => {
                let chunk = match subtype {
                    BlobSubtype::Binary => (*segment_size).max(1),
                    BlobSubtype::Text => TEXT_READ_CHUNK,
                };
                Ok(Box::new(SharedSegments {
                    content: Arc::clone(content),
                    position: 0,
                    chunk,
                }))
            }
            Some(StoredBlob::Open { .. }) => Err(SqlMarshalError::ExecutionError(format!(
                "{id} is still open for writing"
            ))),
            None => Err(unknown(id)),
        }
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn clear(&mut self) {
        self.entries.clear();
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStore")
            .field("blobs", &self.entries.len())
            .finish_non_exhaustive()
    }
}

fn unknown(id: EngineBlobId) -> SqlMarshalError {
    SqlMarshalError::ExecutionError(format!("{id} does not exist"))
}

struct SharedSegments {
    content: Arc<Vec<u8>>,
    position: usize,
    chunk: usize,
}

impl SegmentStream for SharedSegments {
    fn next_segment(&mut self) -> Result<Option<Vec<u8>>, SqlMarshalError> {
        if self.position >= self.content.len() {
            return Ok(None);
        }
        let end = (self.position + self.chunk).min(self.content.len());
        let segment = self.content[self.position..end].to_vec();
        self.position = end;
        Ok(Some(segment))
    }
}
