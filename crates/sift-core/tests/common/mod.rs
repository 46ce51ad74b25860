//! Shared test domain: things in a shop
//!
//! - `weight` selects a plain weight range (extra option 1 = any weight)
//! - `category` selects a catalog category by global name
//! - `owner` selects a person present in the current session
//!   (extra option 1 = nobody owns it)

use std::ops::RangeInclusive;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use sift_core::{
    Behavior, Catalog, Domain, Environment, Filter, FilterItem, Predicate, Scope, Selection,
    SelectionKind, SiftConfig, Tier, TypedPredicate,
};

#[derive(Debug)]
pub struct Shop;

impl Domain for Shop {
    type Item = Thing;
    type Registry = Registry;
    type Env = Session;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thing {
    pub name: String,
    pub category: String,
    pub weight: f64,
    pub owner: Option<String>,
    pub inner: Option<Box<Thing>>,
    pub containers: Vec<Thing>,
}

impl FilterItem for Thing {
    fn wrapped_item(&self) -> Option<&Self> {
        self.inner.as_deref()
    }

    fn container_chain(&self) -> Vec<&Self> {
        self.containers.iter().collect()
    }
}

#[allow(dead_code)]
impl Thing {
    pub fn owned_by(mut self, owner: &str) -> Self {
        self.owner = Some(owner.to_string());
        self
    }

    pub fn wrapping(mut self, inner: Thing) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    pub fn inside(mut self, container: Thing) -> Self {
        self.containers.push(container);
        self
    }
}

#[allow(dead_code)]
pub fn thing(name: &str, category: &str, weight: f64) -> Thing {
    Thing {
        name: name.to_string(),
        category: category.to_string(),
        weight,
        owner: None,
        inner: None,
        containers: Vec::new(),
    }
}

pub struct Registry {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub max_weight: f64,
}

impl Selection<Shop> for Category {
    const TIER: Tier = Tier::Global;

    fn name(&self) -> String {
        self.name.clone()
    }

    fn lookup(name: &str, scope: Scope<'_, Shop>) -> Option<Self> {
        match scope {
            Scope::Global(registry) => registry.categories.iter().find(|c| c.name == name).cloned(),
            Scope::Environment(_) => None,
        }
    }
}

pub struct Session {
    pub label: String,
    pub people: Vec<String>,
}

impl Environment for Session {
    fn label(&self) -> String {
        self.label.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person(pub String);

impl Selection<Shop> for Person {
    const TIER: Tier = Tier::Environment;

    fn name(&self) -> String {
        self.0.clone()
    }

    fn lookup(name: &str, scope: Scope<'_, Shop>) -> Option<Self> {
        match scope {
            Scope::Environment(session) => session
                .people
                .iter()
                .find(|p| p.as_str() == name)
                .map(|p| Person(p.clone())),
            Scope::Global(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightKind;

impl SelectionKind<Shop> for WeightKind {
    type Value = RangeInclusive<f64>;

    fn matches(&self, selection: Option<&RangeInclusive<f64>>, extra: u32, item: &Thing) -> bool {
        extra == 1 || selection.is_some_and(|r| r.contains(&item.weight))
    }
}

/// Remembers the chosen category's weight limit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryKind {
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(skip)]
    pub times_chosen: u32,
}

impl SelectionKind<Shop> for CategoryKind {
    type Value = Category;

    fn matches(&self, selection: Option<&Category>, _extra: u32, item: &Thing) -> bool {
        selection.is_some_and(|c| c.name == item.category)
    }

    fn post_process(&mut self, selection: Option<&Category>) {
        self.limit = selection.map(|c| c.max_weight);
    }

    fn post_chosen(&mut self, _selection: Option<&Category>) {
        self.times_chosen += 1;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerKind;

impl SelectionKind<Shop> for OwnerKind {
    type Value = Person;

    fn matches(&self, selection: Option<&Person>, extra: u32, item: &Thing) -> bool {
        if extra == 1 {
            return item.owner.is_none();
        }
        selection.is_some_and(|p| item.owner.as_deref() == Some(p.0.as_str()))
    }
}

pub const CONFIG: &str = r#"
[tree]
default_name = "Untitled search"

[[kinds]]
kind = "weight"
label = "Weight"
behavior = "weight_range"

[[kinds]]
kind = "category"
label = "Category"
behavior = "category_lookup"

[[kinds]]
kind = "owner"
label = "Owner"
behavior = "owner_lookup"
"#;

fn behavior<K: SelectionKind<Shop> + Default>() -> Behavior<Shop> {
    Box::new(|| Box::new(TypedPredicate::<Shop, K>::new(K::default())) as Box<dyn Filter<Shop>>)
}

#[allow(dead_code)]
pub fn behaviors() -> Vec<(String, Behavior<Shop>)> {
    vec![
        ("weight_range".to_string(), behavior::<WeightKind>()),
        ("category_lookup".to_string(), behavior::<CategoryKind>()),
        ("owner_lookup".to_string(), behavior::<OwnerKind>()),
    ]
}

/// A validated catalog offering every test kind plus the built-in holders
#[allow(dead_code)]
pub fn catalog() -> Catalog<Shop> {
    let config = SiftConfig::from_toml_str(CONFIG).unwrap();
    Catalog::from_config(&config, behaviors()).unwrap()
}

#[allow(dead_code)]
pub fn registry() -> Registry {
    Registry {
        categories: vec![
            Category {
                name: "tools".to_string(),
                max_weight: 10.0,
            },
            Category {
                name: "toys".to_string(),
                max_weight: 2.0,
            },
        ],
    }
}

#[allow(dead_code)]
pub fn session(label: &str, people: &[&str]) -> Rc<Session> {
    Rc::new(Session {
        label: label.to_string(),
        people: people.iter().map(|p| p.to_string()).collect(),
    })
}

#[allow(dead_code)]
pub fn weight(range: RangeInclusive<f64>) -> Predicate<Shop> {
    let typed = TypedPredicate::<Shop, WeightKind>::new(WeightKind).with_selection(range);
    Predicate::new("weight", Box::new(typed)).with_label("Weight")
}

#[allow(dead_code)]
pub fn category(name: &str) -> Predicate<Shop> {
    let value = registry()
        .categories
        .into_iter()
        .find(|c| c.name == name)
        .unwrap();
    let typed = TypedPredicate::<Shop, CategoryKind>::new(CategoryKind::default()).with_selection(value);
    Predicate::new("category", Box::new(typed)).with_label("Category")
}

#[allow(dead_code)]
pub fn owner(name: &str) -> Predicate<Shop> {
    let typed = TypedPredicate::<Shop, OwnerKind>::new(OwnerKind).with_selection(Person(name.to_string()));
    Predicate::new("owner", Box::new(typed)).with_label("Owner")
}

#[allow(dead_code)]
pub type Owner = TypedPredicate<Shop, OwnerKind>;

#[allow(dead_code)]
pub type ByCategory = TypedPredicate<Shop, CategoryKind>;

#[allow(dead_code)]
pub type ByWeight = TypedPredicate<Shop, WeightKind>;
