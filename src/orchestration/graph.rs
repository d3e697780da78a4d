//! Generic State-Machine Runner
//!
//! A graph is a set of nodes over one state type. Each node reads the current
//! state and returns a [`Command`]: a partial update plus the next node to
//! visit. The runner merges the update with [`StateGraph::apply`] and follows
//! the transition until a node returns [`Goto::End`].
//!
//! Nodes never mutate state in place, so every transition can be tested on
//! its own by calling `step` and `apply` directly.

use async_trait::async_trait;
use std::fmt;
use tracing::{debug, instrument};

use crate::types::{AnalystError, Result};

/// Transition target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goto<N> {
    Node(N),
    End,
}

/// State update paired with the next transition
#[derive(Debug, Clone, PartialEq)]
pub struct Command<U, N> {
    pub update: U,
    pub goto: Goto<N>,
}

impl<U, N> Command<U, N> {
    pub fn goto(update: U, node: N) -> Self {
        Self {
            update,
            goto: Goto::Node(node),
        }
    }

    pub fn end(update: U) -> Self {
        Self {
            update,
            goto: Goto::End,
        }
    }
}

#[async_trait]
pub trait StateGraph: Send + Sync {
    type State: Send + Sync;
    type Update: Send;
    type Node: Copy + fmt::Debug + fmt::Display + PartialEq + Send + Sync;

    /// Graph name for logs and errors
    fn name(&self) -> &'static str;

    fn entry(&self) -> Self::Node;

    /// Run one node against the current state
    async fn step(
        &self,
        node: Self::Node,
        state: &Self::State,
    ) -> Result<Command<Self::Update, Self::Node>>;

    /// Merge a node's update into the state
    fn apply(&self, state: Self::State, update: Self::Update) -> Self::State;
}

/// Drives a [`StateGraph`] from its entry node to the end
#[derive(Debug, Clone, Copy)]
pub struct GraphRunner {
    recursion_limit: usize,
}

impl GraphRunner {
    /// Runner failing after `recursion_limit` node visits
    pub fn new(recursion_limit: usize) -> Self {
        Self { recursion_limit }
    }

    pub async fn run<G: StateGraph>(&self, graph: &G, state: G::State) -> Result<G::State> {
        Ok(self.run_traced(graph, state).await?.0)
    }

    /// Run and also return the visited nodes in order
    #[instrument(skip_all, fields(graph = graph.name()))]
    pub async fn run_traced<G: StateGraph>(
        &self,
        graph: &G,
        mut state: G::State,
    ) -> Result<(G::State, Vec<G::Node>)> {
        let mut node = graph.entry();
        let mut path = Vec::new();

        loop {
            if path.len() >= self.recursion_limit {
                return Err(AnalystError::RecursionLimit {
                    graph: graph.name().to_string(),
                    limit: self.recursion_limit,
                });
            }
            path.push(node);
            debug!(step = path.len(), node = %node, "Entering node");

            let Command { update, goto } = graph.step(node, &state).await?;
            state = graph.apply(state, update);

            match goto {
                Goto::Node(next) => node = next,
                Goto::End => break,
            }
        }

        debug!(steps = path.len(), "Graph finished");
        Ok((state, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Node {
        Add,
        Check,
    }

    impl fmt::Display for Node {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    /// Adds one until `target` is reached
    struct Counter {
        target: u32,
    }

    #[async_trait]
    impl StateGraph for Counter {
        type State = u32;
        type Update = u32;
        type Node = Node;

        fn name(&self) -> &'static str {
            "counter"
        }

        fn entry(&self) -> Node {
            Node::Check
        }

        async fn step(&self, node: Node, state: &u32) -> Result<Command<u32, Node>> {
            Ok(match node {
                Node::Add => Command::goto(1, Node::Check),
                Node::Check if *state >= self.target => Command::end(0),
                Node::Check => Command::goto(0, Node::Add),
            })
        }

        fn apply(&self, state: u32, update: u32) -> u32 {
            state + update
        }
    }

    #[tokio::test]
    async fn test_runs_to_end() {
        let runner = GraphRunner::new(100);
        let (state, path) = runner.run_traced(&Counter { target: 2 }, 0).await.unwrap();
        assert_eq!(state, 2);
        assert_eq!(
            path,
            vec![Node::Check, Node::Add, Node::Check, Node::Add, Node::Check]
        );
    }

    #[tokio::test]
    async fn test_recursion_limit() {
        let runner = GraphRunner::new(4);
        let err = runner.run(&Counter { target: 10 }, 0).await.unwrap_err();
        assert!(matches!(
            err,
            AnalystError::RecursionLimit { limit: 4, .. }
        ));
    }
}
