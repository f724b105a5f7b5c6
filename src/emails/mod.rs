//! Email account and folder views over the case database.
//!
//! - `codec`: account/folder keys encoded in the path attribute
//! - `query`: dialect specific page and count SQL
//! - `dao`: cached pages, tree counts and change processing

pub mod codec;
mod dao;
mod error;
mod events;
mod params;
pub mod query;
mod table;

pub use codec::GroupKey;
pub use dao::EmailsDao;
pub use error::DaoError;
pub use events::{ChangeEvent, DomainEvent, EmailEvent, ModuleDataEvent, TreeEvent};
pub use params::{EmailSearchParams, SearchParams};
pub use table::{TableData, build_table};
