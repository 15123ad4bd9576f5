//! Experiment queue use-case service.
//!
//! # Responsibility
//! - Create, copy, rename and remove queue tasks.
//! - Keep the task tree and the path template registry consistent: every
//!   tree mutation and its registry update happen in one call.
//! - Materialise data collections from characterisation strategies.
//!
//! # Invariants
//! - Every path template owned by an attached task is registered.
//! - Removing a node unregisters the templates of its whole subtree.
//! - The root node can be neither removed nor renamed.
//!
//! # See also
//! - `repo::task_tree` for structural contracts.
//! - `service::strategy_ingest` for strategy field mapping.

use crate::context::collect_context::{normalise_sub_dir, CollectContext, ContextError};
use crate::model::parameters::CharacterisationParameters;
use crate::model::sample::Sample;
use crate::model::strategy_result::StrategyResult;
use crate::model::task::{
    Characterisation, DataCollection, EnergyScan, SampleCentring, TaskGroup, TaskKind, TaskNodeId,
};
use crate::repo::task_tree::{TaskNode, TaskTree, TreeError};
use crate::service::collect_request::{to_collect_request, CollectRequest};
use crate::service::strategy_ingest::data_collections_from_strategy;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SAMPLE_CENTRING_NAME: &str = "Centring";

/// Errors from queue service operations.
#[derive(Debug)]
pub enum QueueServiceError {
    /// Tree contract violation.
    Tree(TreeError),
    /// Directory or naming derivation failure.
    Context(ContextError),
    /// Node exists but carries a different task variant.
    WrongKind {
        node_id: TaskNodeId,
        expected: &'static str,
        found: &'static str,
    },
    /// Node exists but has no parent.
    NodeDetached(TaskNodeId),
}

impl Display for QueueServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "{err}"),
            Self::Context(err) => write!(f, "{err}"),
            Self::WrongKind {
                node_id,
                expected,
                found,
            } => write!(
                f,
                "task node {node_id} is a {found}, expected a {expected}"
            ),
            Self::NodeDetached(id) => write!(f, "task node is not attached: {id}"),
        }
    }
}

impl Error for QueueServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Context(err) => Some(err),
            Self::WrongKind { .. } | Self::NodeDetached(_) => None,
        }
    }
}

impl From<TreeError> for QueueServiceError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

impl From<ContextError> for QueueServiceError {
    fn from(value: ContextError) -> Self {
        Self::Context(value)
    }
}

pub type QueueResult<T> = Result<T, QueueServiceError>;

/// Highest run number among direct children of `parent` using `prefix`, plus one.
///
/// Returns 1 when no child matches. Nothing is reserved.
pub fn next_available_run_number(tree: &TaskTree, parent: TaskNodeId, prefix: &str) -> u32 {
    tree.get_children(parent)
        .iter()
        .filter_map(|child| tree.get(*child))
        .filter(|node| node.kind.prefix().as_deref() == Some(prefix))
        .filter_map(|node| node.kind.run_number())
        .max()
        .map_or(1, |largest| largest.saturating_add(1))
}

/// Queue facade owning the task tree and the session context.
#[derive(Debug)]
pub struct QueueService {
    tree: TaskTree,
    context: CollectContext,
}

impl QueueService {
    /// Creates an empty queue bound to `context`.
    pub fn new(context: CollectContext) -> Self {
        Self {
            tree: TaskTree::new(),
            context,
        }
    }

    pub fn tree(&self) -> &TaskTree {
        &self.tree
    }

    pub fn context(&self) -> &CollectContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut CollectContext {
        &mut self.context
    }

    pub fn root_id(&self) -> TaskNodeId {
        self.tree.root_id()
    }

    /// Returns one node or `TreeError::NodeNotFound`.
    pub fn node(&self, id: TaskNodeId) -> QueueResult<&TaskNode> {
        self.tree
            .get(id)
            .ok_or(QueueServiceError::Tree(TreeError::NodeNotFound(id)))
    }

    pub fn create_group(&mut self, parent: TaskNodeId, name: impl Into<String>) -> QueueResult<TaskNodeId> {
        self.attach(parent, TaskKind::Group(TaskGroup), name.into())
    }

    /// Adds a sample; the node is named after the sample's display name or location.
    pub fn create_sample(&mut self, parent: TaskNodeId, sample: Sample) -> QueueResult<TaskNodeId> {
        let display_name = sample.display_name();
        let name = if display_name.is_empty() {
            sample.loc_str.clone()
        } else {
            display_name
        };
        self.attach(parent, TaskKind::Sample(Box::new(sample)), name)
    }

    /// Adds a data collection and registers its path templates.
    ///
    /// Without `name` the node is named `<prefix>_<run>`.
    pub fn create_data_collection(
        &mut self,
        parent: TaskNodeId,
        data_collection: DataCollection,
        name: Option<&str>,
    ) -> QueueResult<TaskNodeId> {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| collection_name(&data_collection));
        self.attach(parent, TaskKind::DataCollection(data_collection), name)
    }

    /// Adds a characterisation and registers its reference collection templates.
    pub fn create_characterisation(
        &mut self,
        parent: TaskNodeId,
        reference_collection: DataCollection,
        parameters: CharacterisationParameters,
        name: Option<&str>,
    ) -> QueueResult<TaskNodeId> {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| collection_name(&reference_collection));
        let characterisation = Characterisation::new(reference_collection, parameters);
        self.attach(
            parent,
            TaskKind::Characterisation(Box::new(characterisation)),
            name,
        )
    }

    /// Adds an energy scan and registers its template.
    pub fn create_energy_scan(
        &mut self,
        parent: TaskNodeId,
        energy_scan: EnergyScan,
        name: Option<&str>,
    ) -> QueueResult<TaskNodeId> {
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let template = energy_scan.path_template.borrow();
                format!("{}_{}", template.prefix(), template.run_number)
            }
        };
        self.attach(parent, TaskKind::EnergyScan(energy_scan), name)
    }

    /// Adds a centring step, optionally bound to the task it centres for.
    pub fn create_sample_centring(
        &mut self,
        parent: TaskNodeId,
        task: Option<TaskNodeId>,
    ) -> QueueResult<TaskNodeId> {
        self.attach(
            parent,
            TaskKind::SampleCentring(SampleCentring { task }),
            SAMPLE_CENTRING_NAME.to_string(),
        )
    }

    /// Detaches `node` and drops its subtree, unregistering every template in it.
    ///
    /// Returns the removed nodes in pre-order.
    pub fn remove(&mut self, node: TaskNodeId) -> QueueResult<Vec<TaskNode>> {
        if node == self.tree.root_id() {
            return Err(TreeError::RootImmovable(node).into());
        }
        self.node(node)?;
        let parent = self
            .tree
            .get_parent(node)
            .ok_or(QueueServiceError::NodeDetached(node))?;

        let removed = self.tree.del_child(parent, node, |pending| {
            debug!(
                "event=task_remove_hook module=queue status=ok kind={} node_id={}",
                pending.kind.kind_name(),
                pending.id()
            );
        })?;

        let mut unregistered = 0usize;
        for removed_node in &removed {
            for template in removed_node.kind.path_templates() {
                if self.context.remove_path_template(&template) {
                    unregistered += 1;
                }
            }
        }
        info!(
            "event=task_remove module=queue status=ok node_id={} removed_nodes={} unregistered_templates={}",
            node,
            removed.len(),
            unregistered
        );
        Ok(removed)
    }

    /// Moves `node` under `new_parent`. Registration is unaffected.
    pub fn set_parent(&mut self, node: TaskNodeId, new_parent: TaskNodeId) -> QueueResult<()> {
        self.tree.set_parent(node, new_parent)?;
        Ok(())
    }

    /// Duplicates a data collection as its next sibling with run number + 1.
    ///
    /// The copy keeps the source's display name.
    pub fn copy_data_collection(&mut self, node: TaskNodeId) -> QueueResult<TaskNodeId> {
        let parent = self.attached_parent(node)?;
        let source_node = self.node(node)?;
        let TaskKind::DataCollection(source) = &source_node.kind else {
            return Err(self.wrong_kind(node, "data_collection"));
        };
        let name = source_node.name.clone();
        let copy = source.deep_copy();
        bump_run_number(&copy);
        info!(
            "event=task_copy module=queue status=ok kind=data_collection source_id={}",
            node
        );
        self.attach(parent, TaskKind::DataCollection(copy), name)
    }

    /// Duplicates a characterisation; the reference collection gets run number + 1.
    pub fn copy_characterisation(&mut self, node: TaskNodeId) -> QueueResult<TaskNodeId> {
        let parent = self.attached_parent(node)?;
        let source_node = self.node(node)?;
        let TaskKind::Characterisation(source) = &source_node.kind else {
            return Err(self.wrong_kind(node, "characterisation"));
        };
        let name = source_node.name.clone();
        let reference = source.reference_collection.deep_copy();
        bump_run_number(&reference);
        let mut copy = Characterisation::new(reference, source.parameters.clone());
        copy.characterisation_software = source.characterisation_software.clone();
        info!(
            "event=task_copy module=queue status=ok kind=characterisation source_id={}",
            node
        );
        self.attach(parent, TaskKind::Characterisation(Box::new(copy)), name)
    }

    /// Renames `node` and moves the output of its collection children into a
    /// sub-directory named after the new name.
    ///
    /// Directories are only rewritten when `node` or an ancestor is a sample.
    pub fn rename(&mut self, node: TaskNodeId, name: impl Into<String>) -> QueueResult<()> {
        if node == self.tree.root_id() {
            return Err(TreeError::RootImmovable(node).into());
        }
        let name = name.into();
        let sub_dir = normalise_sub_dir(&name);

        let directories = self.enclosing_sample(node).map(|sample| {
            (
                self.context.image_directory(sample, Some(&sub_dir)),
                self.context.process_directory(sample, Some(&sub_dir)),
            )
        });

        let target = self
            .tree
            .get_mut(node)
            .ok_or(TreeError::NodeNotFound(node))?;
        target.name = name;

        let Some((image_directory, process_directory)) = directories else {
            warn!(
                "event=task_rename module=queue status=partial reason=no_sample node_id={}",
                node
            );
            return Ok(());
        };

        let children = self.tree.get_children(node).to_vec();
        for child in children {
            let Some(child_node) = self.tree.get(child) else {
                continue;
            };
            let templates = match &child_node.kind {
                TaskKind::DataCollection(dc) => dc.path_templates(),
                TaskKind::Characterisation(characterisation) => {
                    characterisation.reference_collection.path_templates()
                }
                TaskKind::Root
                | TaskKind::Group(_)
                | TaskKind::Sample(_)
                | TaskKind::EnergyScan(_)
                | TaskKind::SampleCentring(_) => Vec::new(),
            };
            for template in templates {
                let mut template = template.borrow_mut();
                template.directory = image_directory.clone();
                template.process_directory = process_directory.clone();
            }
        }
        info!(
            "event=task_rename module=queue status=ok node_id={} sub_dir={}",
            node, sub_dir
        );
        Ok(())
    }

    /// Sets or clears the wavelength label of a data collection's first template.
    pub fn set_mad_prefix(&mut self, node: TaskNodeId, label: Option<&str>) -> QueueResult<()> {
        let TaskKind::DataCollection(dc) = &self.node(node)?.kind else {
            return Err(self.wrong_kind(node, "data_collection"));
        };
        if let Some(template) = dc.path_template() {
            template.borrow_mut().mad_prefix = label.unwrap_or_default().to_string();
        }
        Ok(())
    }

    /// Marks a task as executed (collected for data collections).
    pub fn set_executed(&mut self, node: TaskNodeId, executed: bool) -> QueueResult<()> {
        let target = self
            .tree
            .get_mut(node)
            .ok_or(TreeError::NodeNotFound(node))?;
        target.executed = executed;
        Ok(())
    }

    /// Full paths of every image file `node` will write; empty for non-collecting tasks.
    pub fn files_to_be_written(&self, node: TaskNodeId) -> QueueResult<Vec<String>> {
        let files = self
            .node(node)?
            .kind
            .image_path_template()
            .map(|template| self.context.files_in_window(&template.borrow()))
            .unwrap_or_default();
        Ok(files)
    }

    /// Suggests a run number from the direct children of `parent`.
    pub fn next_available_run_number(&self, parent: TaskNodeId, prefix: &str) -> u32 {
        next_available_run_number(&self.tree, parent, prefix)
    }

    /// Builds the execution-service request for a data collection node.
    pub fn collect_request(&self, node: TaskNodeId) -> QueueResult<CollectRequest> {
        let TaskKind::DataCollection(dc) = &self.node(node)?.kind else {
            return Err(self.wrong_kind(node, "data_collection"));
        };
        Ok(to_collect_request(dc, &self.context))
    }

    /// Adds the data collections proposed by a characterisation strategy under `group`.
    ///
    /// `reference` names a characterisation (or a plain data collection used as
    /// reference) and `sample` the sample node the collections are recorded on.
    /// Returns the ids of the created nodes in sub-wedge order.
    pub fn ingest_characterisation_result(
        &mut self,
        result: &StrategyResult,
        reference: TaskNodeId,
        group: TaskNodeId,
        sample: TaskNodeId,
    ) -> QueueResult<Vec<TaskNodeId>> {
        let reference_collection = match &self.node(reference)?.kind {
            TaskKind::Characterisation(characterisation) => &characterisation.reference_collection,
            TaskKind::DataCollection(dc) => dc,
            _ => return Err(self.wrong_kind(reference, "characterisation")),
        };
        let TaskKind::Sample(sample_record) = &self.node(sample)?.kind else {
            return Err(self.wrong_kind(sample, "sample"));
        };
        let group_name = self.node(group)?.name.as_str();

        let generated = data_collections_from_strategy(
            result,
            reference_collection,
            group_name,
            sample_record,
            &self.context,
        );
        if generated.is_empty() {
            warn!(
                "event=strategy_ingest module=queue status=empty reference_id={}",
                reference
            );
        }

        let mut created = Vec::with_capacity(generated.len());
        for collection in generated {
            let id = self.attach(
                group,
                TaskKind::DataCollection(collection.data_collection),
                collection.name,
            )?;
            created.push(id);
        }
        info!(
            "event=strategy_ingest module=queue status=ok reference_id={} group_id={} created={}",
            reference,
            group,
            created.len()
        );
        Ok(created)
    }

    /// Tab-indented dump of the whole queue.
    pub fn pretty_print(&self) -> String {
        self.tree.pretty_print(self.tree.root_id())
    }

    fn attach(&mut self, parent: TaskNodeId, kind: TaskKind, name: String) -> QueueResult<TaskNodeId> {
        self.node(parent)?;
        let templates = kind.path_templates();
        let kind_name = kind.kind_name();
        let id = self.tree.insert_detached(kind, name);
        if let Err(err) = self.tree.add_child(parent, id) {
            self.tree.remove_detached(id);
            return Err(err.into());
        }
        for template in &templates {
            self.context.add_path_template(template);
        }
        info!(
            "event=task_create module=queue status=ok kind={} node_id={} parent_id={} templates={}",
            kind_name,
            id,
            parent,
            templates.len()
        );
        Ok(id)
    }

    fn attached_parent(&self, node: TaskNodeId) -> QueueResult<TaskNodeId> {
        self.node(node)?;
        self.tree
            .get_parent(node)
            .ok_or(QueueServiceError::NodeDetached(node))
    }

    fn enclosing_sample(&self, node: TaskNodeId) -> Option<&Sample> {
        let own = self.tree.get(node).filter(|candidate| is_sample(candidate));
        let found = own.or_else(|| self.tree.find_ancestor(node, is_sample))?;
        match &found.kind {
            TaskKind::Sample(sample) => Some(sample.as_ref()),
            _ => None,
        }
    }

    fn wrong_kind(&self, node: TaskNodeId, expected: &'static str) -> QueueServiceError {
        match self.tree.get(node) {
            Some(found) => QueueServiceError::WrongKind {
                node_id: node,
                expected,
                found: found.kind.kind_name(),
            },
            None => TreeError::NodeNotFound(node).into(),
        }
    }
}

fn is_sample(node: &TaskNode) -> bool {
    matches!(node.kind, TaskKind::Sample(_))
}

fn collection_name(dc: &DataCollection) -> String {
    match (dc.prefix(), dc.run_number()) {
        (Some(prefix), Some(run_number)) => format!("{prefix}_{run_number}"),
        _ => String::new(),
    }
}

fn bump_run_number(dc: &DataCollection) {
    if let Some(template) = dc.path_template() {
        let mut template = template.borrow_mut();
        template.run_number = template.run_number.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{next_available_run_number, QueueService, QueueServiceError};
    use crate::context::collect_context::CollectContext;
    use crate::model::task::DataCollection;
    use crate::repo::task_tree::TreeError;

    #[test]
    fn removing_root_is_rejected() {
        let mut service = QueueService::new(CollectContext::default());
        let root = service.root_id();
        let err = service.remove(root).unwrap_err();
        assert!(matches!(err, QueueServiceError::Tree(TreeError::RootImmovable(id)) if id == root));
    }

    #[test]
    fn copy_of_group_is_wrong_kind() {
        let mut service = QueueService::new(CollectContext::default());
        let root = service.root_id();
        let group = service.create_group(root, "g").unwrap();
        let err = service.copy_data_collection(group).unwrap_err();
        assert!(matches!(
            err,
            QueueServiceError::WrongKind { expected: "data_collection", found: "task_group", .. }
        ));
    }

    #[test]
    fn attach_under_unknown_parent_leaves_no_orphan() {
        let mut service = QueueService::new(CollectContext::default());
        let before = service.tree().node_count();
        let err = service
            .create_data_collection(uuid::Uuid::new_v4(), DataCollection::default(), None)
            .unwrap_err();
        assert!(matches!(err, QueueServiceError::Tree(TreeError::NodeNotFound(_))));
        assert_eq!(service.tree().node_count(), before);
        assert!(service.context().registry().is_empty());
    }

    #[test]
    fn sibling_scan_on_empty_parent_is_one() {
        let service = QueueService::new(CollectContext::default());
        assert_eq!(next_available_run_number(service.tree(), service.root_id(), "x"), 1);
    }
}
