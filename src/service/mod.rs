pub mod customers;
pub mod dashboard;
pub mod erp_connection;
pub mod image_upload;
pub mod invoices;
pub mod masters;
pub mod parties;
pub mod products;
pub mod session;
pub mod suppliers;
pub mod users;

pub use erp_connection::ErpConnections;
pub use session::SessionKeys;
pub use users::UserService;
