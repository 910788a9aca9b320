pub mod builders;
pub mod db;

pub use builders::{AclBuilder, PrincipalBuilder};
pub use db::TestDb;
