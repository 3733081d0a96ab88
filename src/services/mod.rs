pub mod tourist_api;
