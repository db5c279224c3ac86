//! Concurrent function registry.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::descriptor::FunctionDescriptor;
use crate::error::ClientError;
use crate::handler::FunctionHandler;

#[derive(Clone)]
struct RegisteredFunction {
    descriptor: FunctionDescriptor,
    handler: Arc<dyn FunctionHandler>,
}

/// Maps full function names to their descriptors and handlers.
///
/// Safe for simultaneous register/unregister/lookup from any number of
/// threads.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: DashMap<String, RegisteredFunction>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the descriptor and inserts the handler under its full
    /// name, replacing any previous registration.
    pub fn register(
        &self,
        descriptor: FunctionDescriptor,
        handler: Arc<dyn FunctionHandler>,
    ) -> Result<(), ClientError> {
        descriptor.validate()?;
        let full_name = descriptor.full_name();
        let entry = RegisteredFunction {
            descriptor,
            handler,
        };
        if self.functions.insert(full_name.clone(), entry).is_some() {
            info!(function = %full_name, "replaced existing handler");
        }
        Ok(())
    }

    /// Removes a registration; returns whether anything was removed.
    pub fn unregister(&self, full_name: &str) -> bool {
        self.functions.remove(full_name).is_some()
    }

    /// Looks up a registration by full name.
    #[must_use]
    pub fn get(&self, full_name: &str) -> Option<(FunctionDescriptor, Arc<dyn FunctionHandler>)> {
        self.functions
            .get(full_name)
            .map(|entry| (entry.descriptor.clone(), entry.handler.clone()))
    }

    /// The registered descriptor for a full name.
    #[must_use]
    pub fn descriptor(&self, full_name: &str) -> Option<FunctionDescriptor> {
        self.functions.get(full_name).map(|entry| entry.descriptor.clone())
    }

    /// Full names of every registered function.
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        self.functions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.len())
            .finish()
    }
}
