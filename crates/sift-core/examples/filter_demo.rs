//! Build, edit, save and reload a small predicate tree
//!
//! Run with `RUST_LOG=sift=debug` to see the operation events.

use std::ops::RangeInclusive;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use sift_core::kinds::SubGroup;
use sift_core::logging_facility::{init, Profile};
use sift_core::persist;
use sift_core::{
    Behavior, Catalog, Combinator, Domain, Environment, Filter, FilterItem, FilterTree, Predicate,
    Result, RootKind, Scope, Selection, SelectionKind, SiftConfig, Tier, TypedPredicate,
};

#[derive(Debug)]
struct Library;

#[derive(Debug)]
struct Book {
    title: &'static str,
    pages: i64,
    borrower: Option<&'static str>,
}

impl FilterItem for Book {}

struct Desk {
    members: Vec<String>,
}

impl Environment for Desk {
    fn label(&self) -> String {
        "front desk".to_string()
    }
}

impl Domain for Library {
    type Item = Book;
    type Registry = ();
    type Env = Desk;
}

#[derive(Debug, Clone)]
struct Member(String);

impl Selection<Library> for Member {
    const TIER: Tier = Tier::Environment;

    fn name(&self) -> String {
        self.0.clone()
    }

    fn lookup(name: &str, scope: Scope<'_, Library>) -> Option<Self> {
        match scope {
            Scope::Environment(desk) => desk
                .members
                .iter()
                .find(|m| m.as_str() == name)
                .map(|m| Member(m.clone())),
            Scope::Global(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Pages;

impl SelectionKind<Library> for Pages {
    type Value = RangeInclusive<i64>;

    fn matches(&self, selection: Option<&RangeInclusive<i64>>, _: u32, item: &Book) -> bool {
        selection.is_some_and(|r| r.contains(&item.pages))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BorrowedBy;

impl SelectionKind<Library> for BorrowedBy {
    type Value = Member;

    fn matches(&self, selection: Option<&Member>, _: u32, item: &Book) -> bool {
        selection.is_some_and(|m| item.borrower == Some(m.0.as_str()))
    }
}

const CONFIG: &str = r#"
[[kinds]]
kind = "pages"
label = "Pages"
behavior = "pages"

[[kinds]]
kind = "borrowed_by"
label = "Borrower"
behavior = "borrowed_by"
"#;

fn main() -> Result<()> {
    init(Profile::Development);

    let config = SiftConfig::from_toml_str(CONFIG)?;
    let pages: Behavior<Library> = Box::new(|| {
        Box::new(TypedPredicate::<Library, Pages>::new(Pages)) as Box<dyn Filter<Library>>
    });
    let borrowed: Behavior<Library> = Box::new(|| {
        Box::new(TypedPredicate::<Library, BorrowedBy>::new(BorrowedBy)) as Box<dyn Filter<Library>>
    });
    let catalog = Catalog::from_config(
        &config,
        [("pages".to_string(), pages), ("borrowed_by".to_string(), borrowed)],
    )?;

    let mut tree = FilterTree::<Library>::new("Short or borrowed by ann", RootKind::Search);
    let root = tree.root_group_id();
    let either = tree.add(root, SubGroup::predicate(Combinator::Any), None)?;
    let either_group = tree
        .find_predicate(either)
        .and_then(Predicate::group)
        .map(|g| g.id())
        .unwrap_or(root);

    let short = TypedPredicate::<Library, Pages>::new(Pages).with_selection(0..=200);
    tree.add(either_group, Predicate::new("pages", Box::new(short)), None)?;
    let by_ann = TypedPredicate::<Library, BorrowedBy>::new(BorrowedBy)
        .with_selection(Member("ann".to_string()));
    tree.add(either_group, Predicate::new("borrowed_by", Box::new(by_ann)), None)?;

    let books = [
        Book { title: "Pamphlet", pages: 40, borrower: None },
        Book { title: "Epic", pages: 900, borrower: Some("ann") },
        Book { title: "Almanac", pages: 600, borrower: Some("bo") },
    ];

    let text = persist::to_json(&persist::save(&tree)?)?;
    tree.mark_saved();
    println!("{}", text);

    let mut reloaded = persist::load(&persist::from_json(&text)?, &catalog, &())?;
    let desk = Rc::new(Desk {
        members: vec!["ann".to_string(), "bo".to_string()],
    });
    reloaded.bind_environment(&desk);

    for book in reloaded.filter(&books) {
        println!("match: {}", book.title);
    }
    Ok(())
}
