pub mod cds;
pub mod cva;
