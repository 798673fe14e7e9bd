mod init;
mod purge;
mod seed;
mod serve;

pub use init::cmd_init_config;
pub use purge::cmd_purge;
pub use seed::{SeedReport, cmd_seed, seed_store};
pub use serve::cmd_serve;
