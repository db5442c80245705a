//! Loading of mutation tables and gene identifier key files.

pub mod gene_key;
pub mod maf;
