//! Change-feed inputs: the HTTP webhook and the Redis Pub/Sub subscriber.
//! Both deliver [`ChangeEvent`](crate::document::ChangeEvent) JSON to the notifier.

mod http;
mod redis;

pub use http::receive_event;
pub use redis::ChangeFeedSubscriber;
