use crate::core::Session;
use crate::dom::node::NodeRef;
use crate::dom::wait::Condition;
use crate::errors::{PageModelError, Result};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

/// Caller-facing knobs for a validation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    pub timeout: Option<Duration>,
    /// Check visibility even on nodes marked invisible.
    pub force_visible: bool,
    /// Stop at the first failure; `None` uses the configured default.
    pub fail_fast: Option<bool>,
    /// Check a widget's own element along with its children. Pages and frames ignore it.
    pub include_self: bool,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_force_visible(mut self, force_visible: bool) -> Self {
        self.force_visible = force_visible;
        self
    }

    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = Some(fail_fast);
        self
    }

    #[must_use]
    pub fn with_self(mut self, include_self: bool) -> Self {
        self.include_self = include_self;
        self
    }
}

/// [`ValidateOptions`] with every default filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ValidationPlan {
    pub timeout: Duration,
    pub force_visible: bool,
    pub fail_fast: bool,
}

impl ValidationPlan {
    pub fn resolve(session: &Session, options: &ValidateOptions, default_timeout: Duration) -> Self {
        Self {
            timeout: options.timeout.unwrap_or(default_timeout),
            force_visible: options.force_visible,
            fail_fast: options
                .fail_fast
                .unwrap_or(session.config().validation.fail_fast),
        }
    }
}

/// Check each node in order: presence, plus visibility where expected or forced.
/// Iframes are checked inside their own frame context.
///
/// Boxed because iframe validation re-enters it.
pub(crate) fn validate_nodes<'a>(
    session: &'a Session,
    nodes: Vec<NodeRef<'a>>,
    plan: ValidationPlan,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut failures = Vec::new();
        for node in nodes {
            let element = node.element();
            if element.is_do_not_check() {
                continue;
            }
            let Some(locator) = element.locator() else {
                continue;
            };

            let check_visible = plan.force_visible || element.expects_visible();
            if plan.force_visible && !element.expects_visible() {
                warn!(
                    "element {} ({}) was marked as 'invisible' but force_visible=true",
                    locator,
                    element.kind()
                );
            }

            let outcome = match node.as_iframe() {
                Some(iframe) if check_visible => iframe.validate_within(plan).await,
                _ => {
                    let condition = if check_visible {
                        Condition::PresentAndVisible
                    } else {
                        Condition::Present
                    };
                    element.check(condition, plan.timeout).await
                }
            };

            match outcome {
                Ok(()) => {}
                Err(err) if err.is_wait_failure() => {
                    debug!("{}", err);
                    if plan.fail_fast {
                        return Err(err);
                    }
                    debug!("Continuing check on other elements");
                    failures.push(err.to_string());
                }
                Err(err) => return Err(err),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PageModelError::Timeout(failures.join("- \n")))
        }
    })
}
