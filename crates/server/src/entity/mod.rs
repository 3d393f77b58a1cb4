pub mod endpoint_binding;
pub mod event;
pub mod event_cur;
pub mod marker;
pub mod maskconf;
pub mod queue_message;
pub mod stra;
pub mod team_user;
pub mod user;
