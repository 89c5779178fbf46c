//! # Request/reply over the bus
//!
//! A `map_via` stage publishes each accepted value as a request on a shared
//! bus and is fed by whatever the responder sends back on the request's
//! reply-to key.

use std::sync::Arc;

use reflow::{Composable, Event, Reactor, Selector, SyncDispatcher};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), reflow::FlowError> {
    let bus: Reactor<String> = Reactor::with_dispatcher(Arc::new(SyncDispatcher::new()));
    let greetings = Selector::name("greetings");

    // The responder side: answer every request on its reply-to key.
    let responder = bus.clone();
    bus.on_fn(greetings.clone(), move |request| {
        let reply = format!("hello, {}", request.data);
        responder.reply_to(&request, Event::new(reply));
    });

    // The requester side: one deferred value pushed through the exchange.
    let source = Composable::from_value("world".to_string());
    source.set_dispatcher(Arc::new(SyncDispatcher::new()));
    let answer = source.map_via(greetings, &bus);

    println!("answer: {:?}", answer.wait().await?);
    Ok(())
}
