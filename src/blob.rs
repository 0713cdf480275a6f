//! Segmented blob streaming.
//!
//! A [`BlobChannel`] owns every [`BlobHandle`] it hands out. Handles are plain
//! tokens; the channel keeps the state behind them and forgets all of it when the
//! enclosing transaction ends, after which any handle it issued is rejected with
//! `InvalidState`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{trace, warn};

use crate::config::MarshalOptions;
use crate::engine::{EngineBlobId, EngineClient, SegmentStream};
use crate::error::SqlMarshalError;
use crate::types::BlobSubtype;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to a blob being written or read through a [`BlobChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    channel: u64,
    slot: u64,
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob handle {}:{}", self.channel, self.slot)
    }
}

enum BlobSlot {
    Writing {
        blob: EngineBlobId,
        segment_size: usize,
        written: u64,
    },
    Reading {
        blob: EngineBlobId,
        stream: Box<dyn SegmentStream>,
        finished: bool,
    },
}

impl BlobSlot {
    fn blob(&self) -> EngineBlobId {
        match self {
            BlobSlot::Writing { blob, .. } | BlobSlot::Reading { blob, .. } => *blob,
        }
    }
}

/// Segmented reader/writer for engine blobs.
pub struct BlobChannel {
    id: u64,
    next_slot: u64,
    slots: HashMap<u64, BlobSlot>,
    max_segment_size: usize,
}

impl BlobChannel {
    #[must_use]
    pub fn new(opts: &MarshalOptions) -> Self {
        Self {
            id: NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed),
            next_slot: 1,
            slots: HashMap::new(),
            max_segment_size: opts.max_segment_size.max(1),
        }
    }

    /// Number of handles currently open on this channel.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.slots.len()
    }

    /// Size of the chunks a write for this subtype is split into.
    ///
    /// BINARY blobs honour the declared segment size; TEXT blobs carry no
    /// segmentation of their own and use the largest segment the channel allows.
    #[must_use]
    pub fn effective_segment_size(&self, subtype: BlobSubtype, declared: usize) -> usize {
        match subtype {
            BlobSubtype::Binary => declared.clamp(1, self.max_segment_size),
            BlobSubtype::Text => self.max_segment_size,
        }
    }

    /// Create an engine blob and return a handle for writing it.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for a zero segment size, or the engine's error if the
    /// blob cannot be created.
    pub fn open_for_write<E: EngineClient + ?Sized>(
        &mut self,
        engine: &mut E,
        subtype: BlobSubtype,
        segment_size: usize,
    ) -> Result<BlobHandle, SqlMarshalError> {
        if segment_size == 0 {
            return Err(SqlMarshalError::InvalidArgument(
                "blob segment size must be greater than zero".into(),
            ));
        }
        let segment_size = self.effective_segment_size(subtype, segment_size);
        let blob = engine.create_blob(subtype, segment_size)?;
        let handle = self.insert(BlobSlot::Writing {
            blob,
            segment_size,
            written: 0,
        });
        trace!(%handle, %blob, %subtype, segment_size, "blob opened for write");
        Ok(handle)
    }

    /// Append `bytes` to a blob opened for writing.
    ///
    /// Input longer than the segment size is sent as several segments. If the engine
    /// rejects a segment the blob is cancelled and the handle released.
    ///
    /// # Errors
    /// Returns `InvalidState` if the handle is stale or not open for writing, or the
    /// engine's error if a segment write fails.
    pub fn write_segment<E: EngineClient + ?Sized>(
        &mut self,
        engine: &mut E,
        handle: BlobHandle,
        bytes: &[u8],
    ) -> Result<(), SqlMarshalError> {
        let (blob, segment_size) = match self.slot_mut(handle)? {
            BlobSlot::Writing {
                blob, segment_size, ..
            } => (*blob, *segment_size),
            BlobSlot::Reading { .. } => {
                return Err(SqlMarshalError::InvalidState(format!(
                    "{handle} is open for reading, not writing"
                )));
            }
        };

        for chunk in bytes.chunks(segment_size) {
            if let Err(err) = engine.write_blob_segment(blob, chunk) {
                self.slots.remove(&handle.slot);
                if let Err(cancel_err) = engine.cancel_blob(blob) {
                    warn!(%blob, error = %cancel_err, "failed to cancel blob after write error");
                }
                return Err(err);
            }
            trace!(%blob, len = chunk.len(), "blob segment written");
        }

        if let Some(BlobSlot::Writing { written, .. }) = self.slots.get_mut(&handle.slot) {
            *written += bytes.len() as u64;
        }
        Ok(())
    }

    /// Finalize a written blob, or release a blob opened for reading.
    ///
    /// Returns the engine id, which is what a statement parameter refers to.
    ///
    /// # Errors
    /// Returns `InvalidState` if the handle is stale, or the engine's error if the
    /// blob cannot be closed.
    pub fn close<E: EngineClient + ?Sized>(
        &mut self,
        engine: &mut E,
        handle: BlobHandle,
    ) -> Result<EngineBlobId, SqlMarshalError> {
        self.slot_mut(handle)?;
        let Some(slot) = self.slots.remove(&handle.slot) else {
            return Err(stale(handle));
        };
        let blob = slot.blob();
        match slot {
            BlobSlot::Writing { written, .. } => {
                if let Err(err) = engine.close_blob(blob) {
                    if let Err(cancel_err) = engine.cancel_blob(blob) {
                        warn!(%blob, error = %cancel_err, "failed to cancel blob after close error");
                    }
                    return Err(err);
                }
                trace!(%handle, %blob, written, "blob closed");
            }
            BlobSlot::Reading { stream, .. } => {
                drop(stream);
                engine.close_blob(blob)?;
            }
        }
        Ok(blob)
    }

    /// Open an existing engine blob for segment-by-segment reading.
    ///
    /// # Errors
    /// Returns the engine's error if the blob cannot be opened.
    pub fn open_for_read<E: EngineClient + ?Sized>(
        &mut self,
        engine: &mut E,
        blob: EngineBlobId,
    ) -> Result<BlobHandle, SqlMarshalError> {
        let stream = engine.open_blob(blob)?;
        let handle = self.insert(BlobSlot::Reading {
            blob,
            stream,
            finished: false,
        });
        trace!(%handle, %blob, "blob opened for read");
        Ok(handle)
    }

    /// Next segment of a blob opened for reading; `None` marks the end of the blob.
    ///
    /// Once the end has been reached every further call returns `None`; reading
    /// again requires reopening the blob.
    ///
    /// # Errors
    /// Returns `InvalidState` if the handle is stale or open for writing, or the
    /// engine's error if the segment cannot be read.
    pub fn read_segment(&mut self, handle: BlobHandle) -> Result<Option<Vec<u8>>, SqlMarshalError> {
        match self.slot_mut(handle)? {
            BlobSlot::Reading {
                finished: true, ..
            } => Ok(None),
            BlobSlot::Reading {
                stream, finished, ..
            } => {
                let segment = stream.next_segment()?;
                if segment.is_none() {
                    *finished = true;
                }
                Ok(segment)
            }
            BlobSlot::Writing { .. } => Err(SqlMarshalError::InvalidState(format!(
                "{handle} is open for writing, not reading"
            ))),
        }
    }

    /// Iterate the remaining segments of a blob opened for reading.
    pub fn segments(&mut self, handle: BlobHandle) -> BlobSegments<'_> {
        BlobSegments {
            channel: self,
            handle,
            done: false,
        }
    }

    /// Create, fill and close a blob in one call, returning its engine id.
    ///
    /// `bytes` is fed to the engine in segment-sized slices, so no second copy of the
    /// content is built on this side.
    ///
    /// # Errors
    /// Returns the first error from opening, writing or closing; a blob that fails
    /// part-way is cancelled.
    pub fn write_all<E: EngineClient + ?Sized>(
        &mut self,
        engine: &mut E,
        subtype: BlobSubtype,
        segment_size: usize,
        bytes: &[u8],
    ) -> Result<EngineBlobId, SqlMarshalError> {
        let handle = self.open_for_write(engine, subtype, segment_size)?;
        self.write_segment(engine, handle, bytes)?;
        self.close(engine, handle)
    }

    /// Stream a whole blob into memory.
    ///
    /// # Errors
    /// Returns the first error from opening, reading or closing the blob.
    pub fn read_to_end<E: EngineClient + ?Sized>(
        &mut self,
        engine: &mut E,
        blob: EngineBlobId,
    ) -> Result<Vec<u8>, SqlMarshalError> {
        let handle = self.open_for_read(engine, blob)?;
        let mut content = Vec::new();
        let result = loop {
            match self.read_segment(handle) {
                Ok(Some(segment)) => content.extend_from_slice(&segment),
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        match result {
            Ok(()) => {
                self.close(engine, handle)?;
                Ok(content)
            }
            Err(err) => {
                self.slots.remove(&handle.slot);
                if let Err(close_err) = engine.close_blob(blob) {
                    warn!(%blob, error = %close_err, "failed to close blob after read error");
                }
                Err(err)
            }
        }
    }

    /// Forget every handle issued so far.
    ///
    /// Called when the owning transaction ends. Writes that were never closed are
    /// cancelled on the engine; failures there are logged, not returned, because the
    /// transaction outcome has already been decided.
    pub fn invalidate_all<E: EngineClient + ?Sized>(&mut self, engine: &mut E) {
        for (_, slot) in self.slots.drain() {
            if let BlobSlot::Writing { blob, .. } = slot
                && let Err(err) = engine.cancel_blob(blob)
            {
                warn!(%blob, error = %err, "failed to cancel unfinished blob at transaction end");
            }
        }
    }

    fn insert(&mut self, slot: BlobSlot) -> BlobHandle {
        let handle = BlobHandle {
            channel: self.id,
            slot: self.next_slot,
        };
        self.next_slot += 1;
        self.slots.insert(handle.slot, slot);
        handle
    }

    fn slot_mut(&mut self, handle: BlobHandle) -> Result<&mut BlobSlot, SqlMarshalError> {
        if handle.channel != self.id {
            return Err(SqlMarshalError::InvalidState(format!(
                "{handle} belongs to a different blob channel"
            )));
        }
        self.slots.get_mut(&handle.slot).ok_or_else(|| stale(handle))
    }
}

impl fmt::Debug for BlobChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobChannel")
            .field("id", &self.id)
            .field("open_handles", &self.slots.len())
            .field("max_segment_size", &self.max_segment_size)
            .finish()
    }
}

fn stale(handle: BlobHandle) -> SqlMarshalError {
    SqlMarshalError::InvalidState(format!(
        "{handle} is closed or its transaction has ended"
    ))
}

/// Forward-only iterator over the segments of a blob opened for reading.
pub struct BlobSegments<'a> {
    channel: &'a mut BlobChannel,
    handle: BlobHandle,
    done: bool,
}

impl Iterator for BlobSegments<'_> {
    type Item = Result<Vec<u8>, SqlMarshalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.channel.read_segment(self.handle) {
            Ok(Some(segment)) => Some(Ok(segment)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
