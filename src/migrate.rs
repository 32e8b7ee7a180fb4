//! SQLite DDL generation from the collection schemas.
//!
//! Emits the tables the CMS's SQLite adapter expects for each collection and
//! global: one main table with groups flattened into prefixed columns, a
//! child table per array field, a value table per has-many select, and a
//! `_rels` table for has-many relationships. `hvc migrate sql` prints the
//! result; applying it is left to the CMS migration runner.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::schema::{CollectionSchema, Field, FieldKind, GlobalSchema};

const TIMESTAMP_DEFAULT: &str = "DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))";

/// `zipCode` → `zip_code`, `pdf-library` → `pdf_library`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '-' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// One `CREATE TABLE` plus the indexes that belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    /// Table name as created, e.g. `providers_services_medical`.
    pub name: String,
    /// Column definitions in declaration order (`` `zip_code` text NOT NULL ``).
    columns: Vec<String>,
    /// `FOREIGN KEY` clauses, rendered after the columns.
    foreign_keys: Vec<String>,
    /// `CREATE INDEX` statements emitted after the table.
    indexes: Vec<String>,
}

impl TableDef {
    fn new(name: String) -> Self {
        Self {
            name,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    fn column(&mut self, definition: String) {
        self.columns.push(definition);
    }

    fn index(&mut self, suffix: &str, column: &str) {
        self.indexes.push(format!(
            "CREATE INDEX `{t}_{s}_idx` ON `{t}` (`{c}`);",
            t = self.name,
            s = suffix,
            c = column
        ));
    }

    fn unique_index(&mut self, column: &str) {
        self.indexes.push(format!(
            "CREATE UNIQUE INDEX `{t}_{c}_idx` ON `{t}` (`{c}`);",
            t = self.name,
            c = column
        ));
    }

    fn foreign_key(&mut self, column: &str, target: &str, on_delete: &str) {
        self.foreign_keys.push(format!(
            "FOREIGN KEY (`{}`) REFERENCES `{}`(`id`) ON UPDATE no action ON DELETE {}",
            column, target, on_delete
        ));
    }

    fn render(&self, out: &mut String) {
        out.push_str(&format!("CREATE TABLE `{}` (\n", self.name));
        let body: Vec<&String> = self.columns.iter().chain(&self.foreign_keys).collect();
        for (i, line) in body.iter().enumerate() {
            out.push_str("  ");
            out.push_str(line);
            if i + 1 < body.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push_str(");\n");
        for index in &self.indexes {
            out.push_str(index);
            out.push('\n');
        }
    }
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

fn column_type(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Number => "numeric",
        FieldKind::Checkbox => "integer",
        _ => "text",
    }
}

/// Walk state for one collection or global.
struct Planner {
    root: String,
    /// Drafts-enabled collections allow incomplete documents.
    relaxed: bool,
    children: Vec<TableDef>,
    rel_targets: BTreeSet<&'static str>,
}

impl Planner {
    fn new(root: &str, relaxed: bool) -> Self {
        Self {
            root: root.to_string(),
            relaxed,
            children: Vec::new(),
            rel_targets: BTreeSet::new(),
        }
    }

    fn scalar(&self, table: &mut TableDef, column: &str, field: &Field) {
        let mut def = format!("`{}` {}", column, column_type(&field.kind));
        if let Some(default) = &field.default {
            def.push_str(&format!(" DEFAULT {}", sql_literal(default)));
        }
        if field.required && !self.relaxed {
            def.push_str(" NOT NULL");
        }
        table.column(def);
        if field.unique {
            table.unique_index(column);
        }
    }

    /// Add `fields` to `table`. `prefix` carries flattened group names.
    fn fields(&mut self, table: &mut TableDef, fields: &[Field], prefix: &str) {
        for field in fields {
            let column = format!("{}{}", prefix, snake_case(field.name));
            match &field.kind {
                FieldKind::Group(children) => {
                    self.fields(table, children, &format!("{}_", column));
                }
                FieldKind::Array(children) => {
                    let slot = self.children.len();
                    let mut child = TableDef::new(format!("{}_{}", table.name, column));
                    child.column("`_order` integer NOT NULL".to_string());
                    let parent_type = if table.name == self.root { "integer" } else { "text" };
                    child.column(format!("`_parent_id` {} NOT NULL", parent_type));
                    child.column("`id` text PRIMARY KEY NOT NULL".to_string());
                    self.fields(&mut child, children, "");
                    child.foreign_key("_parent_id", &table.name, "cascade");
                    child.index("order", "_order");
                    child.index("parent_id", "_parent_id");
                    self.children.insert(slot, child);
                }
                FieldKind::Select { has_many: true, .. } => {
                    let mut child = TableDef::new(format!("{}_{}", table.name, column));
                    child.column("`order` integer NOT NULL".to_string());
                    child.column("`parent_id` integer NOT NULL".to_string());
                    child.column("`value` text".to_string());
                    child.column("`id` integer PRIMARY KEY NOT NULL".to_string());
                    child.foreign_key("parent_id", &table.name, "cascade");
                    child.index("order", "order");
                    child.index("parent", "parent_id");
                    self.children.push(child);
                }
                FieldKind::Relationship {
                    relation_to,
                    has_many: true,
                } => {
                    self.rel_targets.insert(*relation_to);
                }
                FieldKind::Upload { relation_to }
                | FieldKind::Relationship {
                    relation_to,
                    has_many: false,
                } => {
                    let id_column = format!("{}_id", column);
                    let mut def = format!("`{}` integer", id_column);
                    if field.required && !self.relaxed {
                        def.push_str(" NOT NULL");
                    }
                    table.column(def);
                    table.foreign_key(&id_column, &snake_case(relation_to), "set null");
                    table.index(&column, &id_column);
                }
                _ => self.scalar(table, &column, field),
            }
        }
    }

    fn rels_table(&self) -> Option<TableDef> {
        if self.rel_targets.is_empty() {
            return None;
        }
        let mut rels = TableDef::new(format!("{}_rels", self.root));
        rels.column("`id` integer PRIMARY KEY NOT NULL".to_string());
        rels.column("`order` integer".to_string());
        rels.column("`parent_id` integer NOT NULL".to_string());
        rels.column("`path` text NOT NULL".to_string());
        for target in &self.rel_targets {
            rels.column(format!("`{}_id` integer", snake_case(target)));
        }
        rels.foreign_key("parent_id", &self.root, "cascade");
        for target in &self.rel_targets {
            let column = format!("{}_id", snake_case(target));
            rels.foreign_key(&column, &snake_case(target), "cascade");
        }
        rels.index("order", "order");
        rels.index("parent", "parent_id");
        rels.index("path", "path");
        for target in &self.rel_targets {
            let column = format!("{}_id", snake_case(target));
            rels.index(&column, &column);
        }
        Some(rels)
    }

    fn finish(self, main: TableDef) -> Vec<TableDef> {
        let rels = self.rels_table();
        let mut tables = vec![main];
        tables.extend(self.children);
        tables.extend(rels);
        tables
    }
}

/// Tables for one collection, main table first.
pub fn collection_tables(collection: &CollectionSchema) -> Vec<TableDef> {
    let name = snake_case(collection.slug);
    let drafts = collection.versions.as_ref().is_some_and(|v| v.drafts);
    let mut planner = Planner::new(&name, drafts);

    let mut main = TableDef::new(name);
    main.column("`id` integer PRIMARY KEY NOT NULL".to_string());
    planner.fields(&mut main, &collection.fields, "");
    main.column(format!("`updated_at` text {} NOT NULL", TIMESTAMP_DEFAULT));
    main.column(format!("`created_at` text {} NOT NULL", TIMESTAMP_DEFAULT));
    main.index("updated_at", "updated_at");
    main.index("created_at", "created_at");
    if drafts {
        main.column("`_status` text DEFAULT 'draft'".to_string());
        main.index("_status", "_status");
    }

    planner.finish(main)
}

/// Tables for one global. Globals carry nullable, unindexed timestamps.
pub fn global_tables(global: &GlobalSchema) -> Vec<TableDef> {
    let name = snake_case(global.slug);
    let mut planner = Planner::new(&name, false);

    let mut main = TableDef::new(name);
    main.column("`id` integer PRIMARY KEY NOT NULL".to_string());
    planner.fields(&mut main, &global.fields, "");
    main.column("`updated_at` text".to_string());
    main.column("`created_at` text".to_string());

    planner.finish(main)
}

fn all_tables(collections: &[CollectionSchema], globals: &[GlobalSchema]) -> Vec<TableDef> {
    collections
        .iter()
        .flat_map(collection_tables)
        .chain(globals.iter().flat_map(global_tables))
        .collect()
}

/// Forward migration script.
pub fn render_up(collections: &[CollectionSchema], globals: &[GlobalSchema]) -> String {
    let mut out = String::new();
    for (i, table) in all_tables(collections, globals).iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        table.render(&mut out);
    }
    out
}

/// Reverse migration: drops every table `render_up` creates, children first.
pub fn render_down(collections: &[CollectionSchema], globals: &[GlobalSchema]) -> String {
    let mut out = String::new();
    for table in all_tables(collections, globals).iter().rev() {
        out.push_str(&format!("DROP TABLE `{}`;\n", table.name));
    }
    out
}
