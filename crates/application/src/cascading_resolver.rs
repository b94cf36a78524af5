use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde_json::Value;
use tessera_core::{AppError, AppResult, DirectoryId, FieldId};
use tessera_domain::{DirectoryField, FieldValue, order_fields};

use crate::schema_ports::DirectoryRepository;

/// Source of the values a dependent directory is narrowed by.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterBinding {
    /// The value entered on the originating trigger.
    Value(FieldValue),
    /// The values `field_id` takes on the matching records of the upstream directory.
    Upstream {
        /// Directory whose matching records feed the filter.
        directory_id: DirectoryId,
        /// Trigger field read from those records.
        field_id: FieldId,
    },
}

/// Attribute filter applied to a dependent directory.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadingFilter {
    /// Attribute of the dependent directory compared against the binding.
    pub field_name: String,
    /// Values the attribute must match.
    pub binding: FilterBinding,
}

/// Directory narrowed by a trigger value, directly or through a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadingDependent {
    /// Directory whose records are narrowed.
    pub dependent_directory_id: DirectoryId,
    /// Trigger field producing this dependency.
    pub trigger_field_id: FieldId,
    /// Filter criterion.
    pub filter: CascadingFilter,
    /// Zero for the originating trigger, incremented along the chain.
    pub depth: usize,
}

/// Resolves cascading trigger dependencies and guards against trigger cycles.
#[derive(Clone)]
pub struct CascadingResolver {
    directories: Arc<dyn DirectoryRepository>,
}

impl CascadingResolver {
    /// Creates a resolver over the schema repository.
    #[must_use]
    pub fn new(directories: Arc<dyn DirectoryRepository>) -> Self {
        Self { directories }
    }

    /// Returns the dependents narrowed when `field_id` takes `raw_value`, in trigger order.
    ///
    /// Fields that are not cascading triggers yield an empty sequence.
    pub async fn resolve_dependents(
        &self,
        field_id: FieldId,
        raw_value: &Value,
    ) -> AppResult<Vec<CascadingDependent>> {
        let field = self
            .directories
            .find_field(field_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("field '{field_id}' does not exist")))?;

        let Some(target) = field.cascading_target() else {
            return Ok(Vec::new());
        };
        let value = FieldValue::cast(field.field_type(), raw_value)?;

        let mut visited = HashSet::from([field.directory_id(), target]);
        let mut queue = VecDeque::from([CascadingDependent {
            dependent_directory_id: target,
            trigger_field_id: field.id(),
            filter: CascadingFilter {
                field_name: field.cascading_target_field().to_owned(),
                binding: FilterBinding::Value(value),
            },
            depth: 0,
        }]);
        let mut dependents = Vec::new();

        while let Some(dependent) = queue.pop_front() {
            let upstream = dependent.dependent_directory_id;
            let mut fields = self.directories.list_fields(upstream).await?;
            order_fields(&mut fields);

            for trigger in fields {
                let Some(next) = trigger.cascading_target() else {
                    continue;
                };
                if !visited.insert(next) {
                    continue;
                }

                queue.push_back(CascadingDependent {
                    dependent_directory_id: next,
                    trigger_field_id: trigger.id(),
                    filter: CascadingFilter {
                        field_name: trigger.cascading_target_field().to_owned(),
                        binding: FilterBinding::Upstream {
                            directory_id: upstream,
                            field_id: trigger.id(),
                        },
                    },
                    depth: dependent.depth + 1,
                });
            }

            dependents.push(dependent);
        }

        Ok(dependents)
    }

    /// Rejects `candidate` when its cascading target closes a trigger cycle.
    ///
    /// The candidate replaces any stored field with the same identifier.
    pub async fn ensure_acyclic(&self, candidate: &DirectoryField) -> AppResult<()> {
        let Some(target) = candidate.cascading_target() else {
            return Ok(());
        };
        let source = candidate.directory_id();

        let mut edges: HashMap<DirectoryId, Vec<DirectoryId>> = HashMap::new();
        for field in self.directories.list_cascading_trigger_fields().await? {
            if field.id() == candidate.id() {
                continue;
            }
            if let Some(next) = field.cascading_target() {
                edges.entry(field.directory_id()).or_default().push(next);
            }
        }
        edges.entry(source).or_default().push(target);

        let mut visited = HashSet::new();
        let mut stack = vec![target];
        while let Some(directory_id) = stack.pop() {
            if directory_id == source {
                return Err(AppError::CyclicDependency(format!(
                    "cascading trigger '{}' closes a cycle through directory '{}'",
                    candidate.name().as_str(),
                    target
                )));
            }
            if !visited.insert(directory_id) {
                continue;
            }
            if let Some(next) = edges.get(&directory_id) {
                stack.extend(next.iter().copied());
            }
        }

        Ok(())
    }
}
