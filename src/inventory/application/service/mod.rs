pub mod client_factory;
pub mod config_normalizer;
pub mod node_dns_cache;
pub mod resource_lister;
pub mod target_mapper;
