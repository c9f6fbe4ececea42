//! One module per subcommand, each with its `Args`, output type and `execute`.

pub mod check;
pub mod embed;
pub mod index;
pub mod ingest;
pub mod judge;
pub mod search;
pub mod status;
pub mod teardown;
