pub mod shanghai;
