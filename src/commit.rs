//! Commit plans - insert/update ordering for nested entity graphs
//!
//! Committing a Quote may touch up to five tables. The order is computed up
//! front as a [`CommitPlan`] without any I/O, then executed step by step
//! against an [`EntityWriter`]. The store is the production writer; tests use
//! a recording fake.
//!
//! Rules:
//! - identity `0` → insert, after committing owned children
//!   (Book: Author, Topic, Language; Quote: Book)
//! - identity `≠ 0` → a single update of the root, children untouched
//!
//! Steps run independently. A failure part-way leaves earlier steps applied.

use crate::entity::{Author, Book, Entity, EntityKind, Language, Quote, Topic};
use crate::storage::Store;
use crate::{Error, Result};

/// What a single commit step does to its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update { id: i64 },
}

impl Action {
    fn for_id(id: i64) -> Self {
        if id == 0 {
            Action::Insert
        } else {
            Action::Update { id }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitStep {
    pub kind: EntityKind,
    pub action: Action,
}

/// Ordered steps for one entity graph; the root is always last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitPlan {
    steps: Vec<CommitStep>,
}

impl CommitPlan {
    fn single(kind: EntityKind, id: i64) -> Self {
        Self {
            steps: vec![CommitStep {
                kind,
                action: Action::for_id(id),
            }],
        }
    }

    fn then(mut self, other: CommitPlan) -> Self {
        self.steps.extend(other.steps);
        self
    }

    pub fn steps(&self) -> &[CommitStep] {
        &self.steps
    }

    /// Number of rows this plan will insert
    pub fn inserts(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.action == Action::Insert)
            .count()
    }

    pub fn root(&self) -> Option<&CommitStep> {
        self.steps.last()
    }
}

/// A borrowed view of one entity, handed to the writer.
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    Topic(&'a Topic),
    Author(&'a Author),
    Language(&'a Language),
    Book(&'a Book),
    Quote(&'a Quote),
}

impl Record<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Topic(_) => EntityKind::Topic,
            Record::Author(_) => EntityKind::Author,
            Record::Language(_) => EntityKind::Language,
            Record::Book(_) => EntityKind::Book,
            Record::Quote(_) => EntityKind::Quote,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Record::Topic(t) => t.id,
            Record::Author(a) => a.id,
            Record::Language(l) => l.id,
            Record::Book(b) => b.id,
            Record::Quote(q) => q.id,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Record::Topic(t) => t.validate(),
            Record::Author(a) => a.validate(),
            Record::Language(l) => l.validate(),
            Record::Book(b) => b.validate(),
            Record::Quote(q) => q.validate(),
        }
    }
}

/// Persists single rows. Foreign keys are read from the nested children,
/// which the plan guarantees are committed first.
pub trait EntityWriter {
    /// Insert a row and return its new identity
    fn insert(&self, record: Record<'_>) -> Result<i64>;

    /// Update the row identified by `record.id()`
    fn update(&self, record: Record<'_>) -> Result<()>;
}

/// A mutable handle to one node of an entity graph.
pub enum NodeMut<'a> {
    Topic(&'a mut Topic),
    Author(&'a mut Author),
    Language(&'a mut Language),
    Book(&'a mut Book),
    Quote(&'a mut Quote),
}

impl NodeMut<'_> {
    pub fn record(&self) -> Record<'_> {
        match self {
            NodeMut::Topic(t) => Record::Topic(t),
            NodeMut::Author(a) => Record::Author(a),
            NodeMut::Language(l) => Record::Language(l),
            NodeMut::Book(b) => Record::Book(b),
            NodeMut::Quote(q) => Record::Quote(q),
        }
    }

    fn set_id(&mut self, id: i64) {
        match self {
            NodeMut::Topic(t) => t.id = id,
            NodeMut::Author(a) => a.id = id,
            NodeMut::Language(l) => l.id = id,
            NodeMut::Book(b) => b.id = id,
            NodeMut::Quote(q) => q.id = id,
        }
    }
}

/// An entity graph that can be committed.
pub trait Commit: Entity {
    /// Compute the steps needed to persist this graph
    fn plan(&self) -> CommitPlan;

    /// Find the node of the given kind inside this graph
    fn node(&mut self, kind: EntityKind) -> Option<NodeMut<'_>>;

    /// Attach this graph, children included, to a store
    fn bind(&mut self, store: &Store);
}

impl Commit for Topic {
    fn plan(&self) -> CommitPlan {
        CommitPlan::single(EntityKind::Topic, self.id)
    }

    fn node(&mut self, kind: EntityKind) -> Option<NodeMut<'_>> {
        (kind == EntityKind::Topic).then_some(NodeMut::Topic(self))
    }

    fn bind(&mut self, store: &Store) {
        Topic::bind(self, store);
    }
}

impl Commit for Author {
    fn plan(&self) -> CommitPlan {
        CommitPlan::single(EntityKind::Author, self.id)
    }

    fn node(&mut self, kind: EntityKind) -> Option<NodeMut<'_>> {
        (kind == EntityKind::Author).then_some(NodeMut::Author(self))
    }

    fn bind(&mut self, store: &Store) {
        Author::bind(self, store);
    }
}

impl Commit for Language {
    fn plan(&self) -> CommitPlan {
        CommitPlan::single(EntityKind::Language, self.id)
    }

    fn node(&mut self, kind: EntityKind) -> Option<NodeMut<'_>> {
        (kind == EntityKind::Language).then_some(NodeMut::Language(self))
    }

    fn bind(&mut self, store: &Store) {
        Language::bind(self, store);
    }
}

impl Commit for Book {
    fn plan(&self) -> CommitPlan {
        if self.id != 0 {
            return CommitPlan::single(EntityKind::Book, self.id);
        }
        self.author
            .plan()
            .then(self.topic.plan())
            .then(self.language.plan())
            .then(CommitPlan::single(EntityKind::Book, 0))
    }

    fn node(&mut self, kind: EntityKind) -> Option<NodeMut<'_>> {
        match kind {
            EntityKind::Book => Some(NodeMut::Book(self)),
            EntityKind::Author => self.author.node(kind),
            EntityKind::Topic => self.topic.node(kind),
            EntityKind::Language => self.language.node(kind),
            EntityKind::Quote => None,
        }
    }

    fn bind(&mut self, store: &Store) {
        Book::bind(self, store);
    }
}

impl Commit for Quote {
    fn plan(&self) -> CommitPlan {
        if self.id != 0 {
            return CommitPlan::single(EntityKind::Quote, self.id);
        }
        self.book.plan().then(CommitPlan::single(EntityKind::Quote, 0))
    }

    fn node(&mut self, kind: EntityKind) -> Option<NodeMut<'_>> {
        match kind {
            EntityKind::Quote => Some(NodeMut::Quote(self)),
            _ => self.book.node(kind),
        }
    }

    fn bind(&mut self, store: &Store) {
        Quote::bind(self, store);
    }
}

/// Execute the plan of `entity` against `writer`.
///
/// Every node named by the plan is validated before the first write. Returns
/// the identity of the root.
pub fn execute<C: Commit + ?Sized>(entity: &mut C, writer: &dyn EntityWriter) -> Result<i64> {
    let plan = entity.plan();

    for step in plan.steps() {
        let node = entity.node(step.kind).ok_or_else(|| missing_node(step.kind))?;
        node.record().validate()?;
    }

    let mut root_id = 0;
    for step in plan.steps() {
        let mut node = entity.node(step.kind).ok_or_else(|| missing_node(step.kind))?;
        root_id = match step.action {
            Action::Insert => {
                let id = writer.insert(node.record())?;
                node.set_id(id);
                id
            }
            Action::Update { id } => {
                writer.update(node.record())?;
                id
            }
        };
    }

    Ok(root_id)
}

fn missing_node(kind: EntityKind) -> Error {
    Error::Validation(format!("commit plan: no {kind} in entity graph"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Writer that records calls and hands out sequential identities.
    #[derive(Default)]
    struct RecordingWriter {
        calls: RefCell<Vec<(EntityKind, Action, i64)>>,
        next_id: Cell<i64>,
        fail_on: Option<EntityKind>,
    }

    impl RecordingWriter {
        fn failing_on(kind: EntityKind) -> Self {
            Self {
                fail_on: Some(kind),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(EntityKind, Action, i64)> {
            self.calls.borrow().clone()
        }
    }

    impl EntityWriter for RecordingWriter {
        fn insert(&self, record: Record<'_>) -> Result<i64> {
            if self.fail_on == Some(record.kind()) {
                return Err(Error::Constraint(format!("{} rejected", record.kind())));
            }
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            // Foreign keys as seen by the writer at insert time
            let fk = match record {
                Record::Book(b) => b.author.id * 100 + b.topic.id * 10 + b.language.id,
                Record::Quote(q) => q.book.id,
                _ => 0,
            };
            self.calls.borrow_mut().push((record.kind(), Action::Insert, fk));
            Ok(id)
        }

        fn update(&self, record: Record<'_>) -> Result<()> {
            self.calls.borrow_mut().push((
                record.kind(),
                Action::Update { id: record.id() },
                0,
            ));
            Ok(())
        }
    }

    fn fresh_book() -> Book {
        Book::new(
            Author::new("Marcus Aurelius"),
            Topic::new("Stoicism"),
            Language::new("Greek"),
            "Meditations",
        )
    }

    #[test]
    fn test_plan_for_fresh_quote_orders_parents_first() {
        let quote = Quote::new(fresh_book(), "Waste no more time arguing.");
        let kinds: Vec<_> = quote.plan().steps().iter().map(|s| s.kind).collect();

        assert_eq!(
            kinds,
            vec![
                EntityKind::Author,
                EntityKind::Topic,
                EntityKind::Language,
                EntityKind::Book,
                EntityKind::Quote,
            ]
        );
        assert_eq!(quote.plan().inserts(), 5);
    }

    #[test]
    fn test_plan_for_persisted_root_is_single_update() {
        let mut book = fresh_book();
        book.id = 7;
        book.author.id = 0;

        let plan = book.plan();
        assert_eq!(plan.steps().len(), 1);
        assert_eq!(
            plan.root(),
            Some(&CommitStep {
                kind: EntityKind::Book,
                action: Action::Update { id: 7 },
            })
        );
    }

    #[test]
    fn test_plan_mixes_updates_for_existing_children() {
        let mut book = fresh_book();
        book.topic.id = 3;

        let plan = book.plan();
        assert_eq!(plan.inserts(), 3);
        assert_eq!(plan.steps()[1].action, Action::Update { id: 3 });
    }

    #[test]
    fn test_execute_binds_foreign_keys_from_new_parents() {
        let writer = RecordingWriter::default();
        let mut book = fresh_book();

        let id = execute(&mut book, &writer).unwrap();

        assert_eq!(id, 4);
        assert_eq!((book.author.id, book.topic.id, book.language.id), (1, 2, 3));
        let calls = writer.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[3], (EntityKind::Book, Action::Insert, 123));
    }

    #[test]
    fn test_execute_update_keeps_identity() {
        let writer = RecordingWriter::default();
        let mut topic = Topic::new("Ethics");
        topic.id = 12;

        assert_eq!(execute(&mut topic, &writer).unwrap(), 12);
        assert_eq!(
            writer.calls(),
            vec![(EntityKind::Topic, Action::Update { id: 12 }, 0)]
        );
    }

    #[test]
    fn test_execute_validates_before_any_write() {
        let writer = RecordingWriter::default();
        let mut quote = Quote::new(fresh_book(), "");

        assert!(matches!(
            execute(&mut quote, &writer),
            Err(Error::Validation(_))
        ));
        assert!(writer.calls().is_empty());
    }

    #[test]
    fn test_execute_stops_at_first_failure_and_keeps_earlier_steps() {
        let writer = RecordingWriter::failing_on(EntityKind::Book);
        let mut quote = Quote::new(fresh_book(), "The impediment to action advances action.");

        let err = execute(&mut quote, &writer).unwrap_err();

        assert!(matches!(err, Error::Constraint(_)));
        assert_eq!(writer.calls().len(), 3);
        assert_eq!(quote.book.author.id, 1);
        assert_eq!(quote.book.id, 0);
        assert_eq!(quote.id, 0);
    }
}
