pub mod customers;
pub mod dashboard;
pub mod erp;
pub mod health;
pub mod images;
pub mod invoices;
pub mod products;
pub mod suppliers;
pub mod users;
