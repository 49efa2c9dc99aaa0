use std::fmt::Write;
use strata_core::SqlWriter;

#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_value_infinity(&self, out: &mut String, negative: bool) {
        if negative {
            out.push('-');
        }
        out.push_str("9e999");
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        for b in value {
            let _ = write!(out, "{:02X}", b);
        }
        out.push('\'');
    }

    // VALUES does not accept DEFAULT
    fn write_value_missing(&self, out: &mut String) {
        out.push_str("NULL");
    }

    fn write_limit_offset(&self, out: &mut String, limit: u64, offset: u64) {
        if limit > 0 {
            let _ = write!(out, "\nLIMIT {limit}");
        } else if offset > 0 {
            out.push_str("\nLIMIT -1");
        }
        if offset > 0 {
            let _ = write!(out, "\nOFFSET {offset}");
        }
    }
}
