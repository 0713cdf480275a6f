#![allow(dead_code)]

use std::collections::HashMap;

use sql_marshal::prelude::*;

/// In-memory engine that records what the marshalling layer sends it.
///
/// Statements must be registered before they are prepared. Executed statements are
/// buffered until commit; query results are canned per SQL string.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    statements: HashMap<String, PreparedStatement>,
    responses: HashMap<String, Vec<Vec<WireValue>>>,
    pub pending: Vec<(String, Vec<WireValue>)>,
    pub committed: Vec<(String, Vec<WireValue>)>,
    pub blobs: HashMap<EngineBlobId, MockBlob>,
    next_blob: u64,
    pub in_transaction: bool,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub cancelled: Vec<EngineBlobId>,
    pub segment_writes: Vec<usize>,
    pub read_chunk: usize,
    pub fail_commit: bool,
    pub fail_blob_write_at: Option<usize>,
    pub fail_blob_read_at: Option<usize>,
    pub close_calls: Vec<EngineBlobId>,
}

#[derive(Debug, Clone)]
pub struct MockBlob {
    pub subtype: BlobSubtype,
    pub segment_size: usize,
    pub content: Vec<u8>,
    pub closed: bool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            read_chunk: 7,
            ..Self::default()
        }
    }

    pub fn register(
        &mut self,
        sql: &str,
        param_types: Vec<ColumnType>,
        result_columns: Vec<ResultColumn>,
    ) {
        self.statements.insert(
            sql.to_string(),
            PreparedStatement::new(sql, param_types, result_columns),
        );
    }

    pub fn respond(&mut self, sql: &str, rows: Vec<Vec<WireValue>>) {
        self.responses.insert(sql.to_string(), rows);
    }

    /// Store a finished blob directly, as if a previous transaction had written it.
    pub fn seed_blob(&mut self, subtype: BlobSubtype, content: Vec<u8>) -> EngineBlobId {
        self.next_blob += 1;
        let id = EngineBlobId(self.next_blob);
        self.blobs.insert(
            id,
            MockBlob {
                subtype,
                segment_size: 80,
                content,
                closed: true,
            },
        );
        id
    }

    pub fn blobs_created(&self) -> usize {
        usize::try_from(self.next_blob).unwrap()
    }
}

struct VecSegments {
    content: Vec<u8>,
    position: usize,
    chunk: usize,
    served: usize,
    fail_at: Option<usize>,
}

impl SegmentStream for VecSegments {
    fn next_segment(&mut self) -> Result<Option<Vec<u8>>, SqlMarshalError> {
        if self.fail_at == Some(self.served) {
            return Err(SqlMarshalError::ExecutionError("segment read refused".into()));
        }
        self.served += 1;
        if self.position >= self.content.len() {
            return Ok(None);
        }
        let end = (self.position + self.chunk).min(self.content.len());
        let segment = self.content[self.position..end].to_vec();
        self.position = end;
        Ok(Some(segment))
    }
}

impl EngineClient for RecordingEngine {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement, SqlMarshalError> {
        self.statements
            .get(sql)
            .cloned()
            .ok_or_else(|| SqlMarshalError::ExecutionError(format!("unknown statement: {sql}")))
    }

    fn execute(
        &mut self,
        statement: &PreparedStatement,
        params: &[BoundValue],
    ) -> Result<RawRows, SqlMarshalError> {
        if !self.in_transaction {
            return Err(SqlMarshalError::ExecutionError(
                "statement executed outside a transaction".into(),
            ));
        }
        let wire: Vec<WireValue> = params.iter().map(|p| p.wire().clone()).collect();
        for value in &wire {
            if let WireValue::Blob(id) = value {
                match self.blobs.get(id) {
                    Some(blob) if blob.closed => {}
                    _ => {
                        return Err(SqlMarshalError::ExecutionError(format!(
                            "{id} is not a closed blob"
                        )));
                    }
                }
            }
        }
        self.pending.push((statement.sql().to_string(), wire));
        match self.responses.get(statement.sql()) {
            Some(rows) => Ok(RawRows::from_rows(rows.clone())),
            None => Ok(RawRows::empty(1)),
        }
    }

    fn begin_transaction(&mut self) -> Result<(), SqlMarshalError> {
        if self.in_transaction {
            return Err(SqlMarshalError::ExecutionError("nested begin".into()));
        }
        self.in_transaction = true;
        self.begins += 1;
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<(), SqlMarshalError> {
        if self.fail_commit {
            return Err(SqlMarshalError::ExecutionError("commit refused".into()));
        }
        self.in_transaction = false;
        self.commits += 1;
        self.committed.append(&mut self.pending);
        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<(), SqlMarshalError> {
        self.in_transaction = false;
        self.rollbacks += 1;
        self.pending.clear();
        Ok(())
    }

    fn create_blob(
        &mut self,
        subtype: BlobSubtype,
        segment_size: usize,
    ) -> Result<EngineBlobId, SqlMarshalError> {
        self.next_blob += 1;
        let id = EngineBlobId(self.next_blob);
        self.blobs.insert(
            id,
            MockBlob {
                subtype,
                segment_size,
                content: Vec::new(),
                closed: false,
            },
        );
        Ok(id)
    }

    fn write_blob_segment(&mut self, id: EngineBlobId, bytes: &[u8]) -> Result<(), SqlMarshalError> {
        if self.fail_blob_write_at == Some(self.segment_writes.len()) {
            return Err(SqlMarshalError::ExecutionError("segment write refused".into()));
        }
        let blob = self
            .blobs
            .get_mut(&id)
            .ok_or_else(|| SqlMarshalError::ExecutionError(format!("{id} does not exist")))?;
        if blob.closed || bytes.len() > blob.segment_size {
            return Err(SqlMarshalError::ExecutionError(format!(
                "bad segment of {} bytes for {id}",
                bytes.len()
            )));
        }
        blob.content.extend_from_slice(bytes);
        self.segment_writes.push(bytes.len());
        Ok(())
    }

    fn close_blob(&mut self, id: EngineBlobId) -> Result<(), SqlMarshalError> {
        self.close_calls.push(id);
        let blob = self
            .blobs
            .get_mut(&id)
            .ok_or_else(|| SqlMarshalError::ExecutionError(format!("{id} does not exist")))?;
        blob.closed = true;
        Ok(())
    }

    fn cancel_blob(&mut self, id: EngineBlobId) -> Result<(), SqlMarshalError> {
        self.blobs.remove(&id);
        self.cancelled.push(id);
        Ok(())
    }

    fn open_blob(&mut self, id: EngineBlobId) -> Result<Box<dyn SegmentStream>, SqlMarshalError> {
        let blob = self
            .blobs
            .get(&id)
            .filter(|blob| blob.closed)
            .ok_or_else(|| SqlMarshalError::ExecutionError(format!("{id} is not readable")))?;
        Ok(Box::new(VecSegments {
            content: blob.content.clone(),
            position: 0,
            chunk: self.read_chunk.max(1),
            served: 0,
            fail_at: self.fail_blob_read_at,
        }))
    }

    fn execute_script(&mut self, _sql: &str) -> Result<(), SqlMarshalError> {
        Ok(())
    }
}

pub fn connection(engine: RecordingEngine) -> Connection<RecordingEngine> {
    Connection::with_defaults(engine)
}
