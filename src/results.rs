mod decoder;
mod result_set;
mod row;

pub use decoder::{RowDecoder, decode_row};
pub use result_set::ResultSet;
pub use row::Row;
