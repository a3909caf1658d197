//! Ordered interceptor composition.
//!
//! An interceptor observes an input and a continuation representing
//! "run the remaining pipeline, then the base behavior". It may
//! transform the input, transform the result, skip the continuation
//! entirely, or call it more than once.
//!
//! Composition order: the first registered interceptor is outermost;
//! later registrations wrap closer to the base behavior. An empty
//! interceptor list reduces to calling the base directly.

use std::sync::Arc;

use async_trait::async_trait;

/// A synchronous pipeline stage.
pub trait Interceptor<I, O>: Send + Sync {
    fn handle(&self, input: I, next: &dyn Fn(I) -> O) -> O;
}

/// Run `input` through `interceptors`, ending at `base`.
pub fn run<I, O>(interceptors: &[Arc<dyn Interceptor<I, O>>], input: I, base: &dyn Fn(I) -> O) -> O {
    match interceptors.split_first() {
        None => base(input),
        Some((first, rest)) => first.handle(input, &|next_input| run(rest, next_input, base)),
    }
}

/// An asynchronous pipeline stage.
#[async_trait]
pub trait AsyncInterceptor<I, O>: Send + Sync {
    async fn handle(&self, input: I, next: &dyn AsyncNext<I, O>) -> O;
}

/// Continuation handed to an [`AsyncInterceptor`].
#[async_trait]
pub trait AsyncNext<I, O>: Send + Sync {
    async fn call(&self, input: I) -> O;
}

struct Link<'a, I, O> {
    rest: &'a [Arc<dyn AsyncInterceptor<I, O>>],
    base: &'a dyn AsyncNext<I, O>,
}

#[async_trait]
impl<'a, I, O> AsyncNext<I, O> for Link<'a, I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn call(&self, input: I) -> O {
        match self.rest.split_first() {
            None => self.base.call(input).await,
            Some((first, rest)) => {
                first
                    .handle(
                        input,
                        &Link {
                            rest,
                            base: self.base,
                        },
                    )
                    .await
            }
        }
    }
}

/// Run `input` through `interceptors`, ending at `base`.
pub async fn run_async<I, O>(
    interceptors: &[Arc<dyn AsyncInterceptor<I, O>>],
    input: I,
    base: &dyn AsyncNext<I, O>,
) -> O
where
    I: Send + 'static,
    O: Send + 'static,
{
    Link {
        rest: interceptors,
        base,
    }
    .call(input)
    .await
}
