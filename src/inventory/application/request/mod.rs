pub mod resolve_request;
