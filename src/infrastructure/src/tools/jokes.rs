use async_trait::async_trait;
use domain::services::{Capability, CapabilitySource};
use rand::seq::SliceRandom;
use serde_json::{json, Value};
use shared::types::JsonMap;

const JOKES: [(&str, &str); 8] = [
    ("Why do programmers prefer dark mode?", "Because light attracts bugs!"),
    ("Why did the developer go broke?", "Because he used up all his cache!"),
    (
        "How many programmers does it take to change a light bulb?",
        "None. It's a hardware problem!",
    ),
    ("Why do Java developers wear glasses?", "Because they don't C#!"),
    ("What's a programmer's favorite hangout place?", "Foo Bar!"),
    ("Why did the Kubernetes pod go to therapy?", "It had too many container issues!"),
    (
        "What do you call a developer who doesn't comment their code?",
        "A job security expert!",
    ),
    (
        "Why was the JavaScript developer sad?",
        "Because he didn't Node how to Express himself!",
    ),
];

pub struct JokeSource;

impl CapabilitySource for JokeSource {
    fn source_name(&self) -> &str {
        "jokes"
    }

    fn capabilities(&self) -> Vec<Box<dyn Capability>> {
        vec![Box::new(GetRandomJoke)]
    }
}

pub struct GetRandomJoke;

#[async_trait]
impl Capability for GetRandomJoke {
    fn name(&self) -> &str {
        "get_random_joke"
    }

    fn description(&self) -> &str {
        "Get a random programming joke with a setup and a punchline"
    }

    async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
        let (setup, punchline) = JOKES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(JOKES[0]);
        Ok(json!({ "setup": setup, "punchline": punchline }))
    }
}
