mod repo;
mod schema;

pub use repo::DataRepo;
pub use schema::init_database;
