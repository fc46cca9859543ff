pub mod task_response;
