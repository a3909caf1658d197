//! Per-variant fragment dispatch and recursive execution.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use esi_core::{ExecutionContext, Fragment, FragmentKind, IncludeError, IncludeLoader};
use esi_expr::evaluate;
use esi_pipeline::{AsyncInterceptor, AsyncNext};
use futures::future::{self, BoxFuture};
use tracing::{debug, warn};

use crate::substitute::substitute_variables;

/// Ordered output chunks of one fragment.
pub type Chunks = Vec<String>;

pub type ExecuteResult = Result<Chunks, ExecuteError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecuteError {
    /// No handler registered for a fragment variant; a configuration
    /// defect, not a user-recoverable condition.
    #[error("no executor registered for {0} fragments")]
    UnsupportedFragment(FragmentKind),

    #[error(transparent)]
    Include(#[from] IncludeError),
}

/// Owned view of one execution step, handed to execute interceptors.
#[derive(Debug, Clone)]
pub struct ExecuteInput {
    pub fragment: Fragment,
    pub context: ExecutionContext,
}

pub type ExecuteInterceptor = Arc<dyn AsyncInterceptor<ExecuteInput, ExecuteResult>>;

type Handler =
    for<'a> fn(&'a FragmentExecutor, &'a Fragment, &'a ExecutionContext) -> BoxFuture<'a, ExecuteResult>;

/// Executes a fragment tree into an ordered sequence of output chunks.
///
/// Dispatch goes through a registry keyed by fragment kind, populated
/// with the standard handlers at construction. Execute interceptors
/// registered per kind wrap the dispatch; the first registered
/// interceptor is outermost.
pub struct FragmentExecutor {
    handlers: HashMap<FragmentKind, Handler>,
    interceptors: HashMap<FragmentKind, Vec<ExecuteInterceptor>>,
    loader: Arc<dyn IncludeLoader>,
}

impl FragmentExecutor {
    pub fn new(loader: Arc<dyn IncludeLoader>) -> Self {
        Self {
            handlers: standard_handlers(),
            interceptors: HashMap::new(),
            loader,
        }
    }

    /// Register an execute interceptor for one fragment kind.
    pub fn with_interceptor(mut self, kind: FragmentKind, interceptor: ExecuteInterceptor) -> Self {
        self.interceptors.entry(kind).or_default().push(interceptor);
        self
    }

    /// Execute a fragment. Children of composites run concurrently;
    /// output order always equals document order.
    pub fn execute<'a>(
        &'a self,
        fragment: &'a Fragment,
        context: &'a ExecutionContext,
    ) -> BoxFuture<'a, ExecuteResult> {
        Box::pin(async move {
            match self.interceptors.get(&fragment.kind()) {
                Some(interceptors) if !interceptors.is_empty() => {
                    let input = ExecuteInput {
                        fragment: fragment.clone(),
                        context: context.clone(),
                    };
                    esi_pipeline::run_async(interceptors, input, &Dispatch { executor: self }).await
                }
                _ => self.dispatch(fragment, context).await,
            }
        })
    }

    async fn dispatch(&self, fragment: &Fragment, context: &ExecutionContext) -> ExecuteResult {
        match self.handlers.get(&fragment.kind()) {
            Some(handler) => handler(self, fragment, context).await,
            None => Err(ExecuteError::UnsupportedFragment(fragment.kind())),
        }
    }
}

/// Base behavior of the execute pipeline: plain dispatch.
struct Dispatch<'a> {
    executor: &'a FragmentExecutor,
}

#[async_trait]
impl AsyncNext<ExecuteInput, ExecuteResult> for Dispatch<'_> {
    async fn call(&self, input: ExecuteInput) -> ExecuteResult {
        self.executor.dispatch(&input.fragment, &input.context).await
    }
}

fn standard_handlers() -> HashMap<FragmentKind, Handler> {
    let mut handlers: HashMap<FragmentKind, Handler> = HashMap::new();
    handlers.insert(FragmentKind::Text, execute_text);
    handlers.insert(FragmentKind::Ignore, execute_ignore);
    handlers.insert(FragmentKind::Composite, execute_composite);
    handlers.insert(FragmentKind::Include, execute_include);
    handlers.insert(FragmentKind::Try, execute_try);
    handlers.insert(FragmentKind::Choose, execute_choose);
    handlers.insert(FragmentKind::Vars, execute_vars);
    handlers
}

fn execute_text<'a>(
    _executor: &'a FragmentExecutor,
    fragment: &'a Fragment,
    _context: &'a ExecutionContext,
) -> BoxFuture<'a, ExecuteResult> {
    Box::pin(async move {
        match fragment {
            Fragment::Text(body) => Ok(vec![body.clone()]),
            other => Err(ExecuteError::UnsupportedFragment(other.kind())),
        }
    })
}

fn execute_ignore<'a>(
    _executor: &'a FragmentExecutor,
    fragment: &'a Fragment,
    _context: &'a ExecutionContext,
) -> BoxFuture<'a, ExecuteResult> {
    Box::pin(async move {
        match fragment {
            Fragment::Ignore => Ok(Vec::new()),
            other => Err(ExecuteError::UnsupportedFragment(other.kind())),
        }
    })
}

/// Children are polled concurrently to overlap network-bound includes;
/// `try_join_all` gathers their outputs in declaration order and drops
/// the remaining futures on the first error.
fn execute_composite<'a>(
    executor: &'a FragmentExecutor,
    fragment: &'a Fragment,
    context: &'a ExecutionContext,
) -> BoxFuture<'a, ExecuteResult> {
    Box::pin(async move {
        match fragment {
            Fragment::Composite(children) => {
                let outputs = future::try_join_all(
                    children.iter().map(|child| executor.execute(child, context)),
                )
                .await?;
                Ok(outputs.into_iter().flatten().collect())
            }
            other => Err(ExecuteError::UnsupportedFragment(other.kind())),
        }
    })
}

fn execute_vars<'a>(
    _executor: &'a FragmentExecutor,
    fragment: &'a Fragment,
    context: &'a ExecutionContext,
) -> BoxFuture<'a, ExecuteResult> {
    Box::pin(async move {
        match fragment {
            Fragment::Vars(body) => Ok(vec![substitute_variables(body, context.variables())]),
            other => Err(ExecuteError::UnsupportedFragment(other.kind())),
        }
    })
}

/// The first `when` whose test holds wins; otherwise the `otherwise`
/// fragment renders.
fn execute_choose<'a>(
    executor: &'a FragmentExecutor,
    fragment: &'a Fragment,
    context: &'a ExecutionContext,
) -> BoxFuture<'a, ExecuteResult> {
    Box::pin(async move {
        match fragment {
            Fragment::Choose { whens, otherwise } => {
                for when in whens {
                    if evaluate(&when.test, context.variables()) {
                        return executor.execute(&when.body, context).await;
                    }
                }
                executor.execute(otherwise, context).await
            }
            other => Err(ExecuteError::UnsupportedFragment(other.kind())),
        }
    })
}

/// Any error out of `attempt`, at any recursion depth, is recorded and
/// recovered through `except`. An error out of `except` propagates.
fn execute_try<'a>(
    executor: &'a FragmentExecutor,
    fragment: &'a Fragment,
    context: &'a ExecutionContext,
) -> BoxFuture<'a, ExecuteResult> {
    Box::pin(async move {
        match fragment {
            Fragment::Try { attempt, except } => {
                match executor.execute(attempt, context).await {
                    Ok(chunks) => Ok(chunks),
                    Err(error) => {
                        warn!(%error, "attempt failed; rendering except branch");
                        executor.execute(except, context).await
                    }
                }
            }
            other => Err(ExecuteError::UnsupportedFragment(other.kind())),
        }
    })
}

/// Loads the include through the injected loader and recursively
/// executes the result one depth level down, so nested includes
/// resolve transitively.
fn execute_include<'a>(
    executor: &'a FragmentExecutor,
    fragment: &'a Fragment,
    context: &'a ExecutionContext,
) -> BoxFuture<'a, ExecuteResult> {
    Box::pin(async move {
        match fragment {
            Fragment::Include { src } => {
                if context.depth_exceeded() {
                    return Err(ExecuteError::Include(IncludeError::TooDeep {
                        uri: src.clone(),
                        depth: context.depth(),
                    }));
                }
                let loaded = executor.loader.load(src, context).await?;
                debug!(uri = %loaded.uri, depth = context.depth(), "include resolved");
                let child_context = context.descend();
                executor.execute(&loaded.fragment, &child_context).await
            }
            other => Err(ExecuteError::UnsupportedFragment(other.kind())),
        }
    })
}
