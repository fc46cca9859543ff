pub mod cluster_resource;
pub mod guest_config;
pub mod guest_interface;
pub mod node_dns;
pub mod normalized_record;
pub mod proxmox_auth;
pub mod proxmox_connection;
pub mod target;
