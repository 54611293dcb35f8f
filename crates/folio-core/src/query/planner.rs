//! Query planning.

use std::collections::BTreeSet;
use std::sync::Arc;

use folio_proto::{Predicate, Projection, QueryModel, Selector};

use super::engine::QueryPhase;
use super::plan::{ExecutionPlan, PlanNode};
use crate::catalog::TypeCatalog;
use crate::context::InvocationContext;
use crate::error::Error;

/// Builds an execution plan from a query model.
///
/// Semantic issues with the query are reported as problems on the context
/// rather than as errors; the engine stops before optimizing when any were
/// recorded.
pub trait QueryPlanner: Send + Sync {
    fn create_plan(
        &self,
        ctx: &mut InvocationContext,
        model: &QueryModel,
    ) -> Result<ExecutionPlan, Error>;
}

/// Planner that resolves a query against a [`TypeCatalog`].
pub struct CatalogPlanner {
    catalog: Arc<TypeCatalog>,
}

impl CatalogPlanner {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self { catalog }
    }

    fn resolve_columns(&self, model: &QueryModel, problems: &mut BTreeSet<String>) -> Vec<String> {
        match &model.projection {
            Projection::All => self
                .catalog
                .properties(&model.source)
                .into_iter()
                .map(|p| p.id.clone())
                .collect(),
            Projection::Properties(columns) => {
                for column in columns {
                    if self.catalog.property(&model.source, column).is_none() {
                        problems.insert(self.unknown_property(model, column));
                    }
                }
                columns.clone()
            }
        }
    }

    fn check_predicate(
        &self,
        model: &QueryModel,
        predicate: &Predicate,
        problems: &mut BTreeSet<String>,
    ) {
        match predicate {
            Predicate::Compare { property, .. }
            | Predicate::In { property, .. }
            | Predicate::Like { property, .. }
            | Predicate::IsNull { property, .. } => {
                match self.catalog.property(&model.source, property) {
                    None => {
                        problems.insert(self.unknown_property(model, property));
                    }
                    Some(def) if !def.queryable => {
                        problems.insert(format!("property '{}' is not queryable", property));
                    }
                    Some(_) => {}
                }
            }
            Predicate::InFolder(_) => {
                let fileable = self
                    .catalog
                    .get(&model.source)
                    .is_some_and(|def| def.base.is_fileable());
                if !fileable {
                    problems.insert(format!(
                        "IN_FOLDER cannot be used with non-fileable type '{}'",
                        model.source
                    ));
                }
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                for part in parts {
                    self.check_predicate(model, part, problems);
                }
            }
            Predicate::Not(inner) => self.check_predicate(model, inner, problems),
        }
    }

    fn unknown_property(&self, model: &QueryModel, property: &str) -> String {
        format!("unknown property '{}' on type '{}'", property, model.source)
    }
}

impl QueryPlanner for CatalogPlanner {
    fn create_plan(
        &self,
        ctx: &mut InvocationContext,
        model: &QueryModel,
    ) -> Result<ExecutionPlan, Error> {
        let mut problems = BTreeSet::new();

        if !self.catalog.contains(&model.source) {
            problems.insert(format!("unknown source type '{}'", model.source));
        }

        let columns = self.resolve_columns(model, &mut problems);

        if let Some(predicate) = &model.predicate {
            self.check_predicate(model, predicate, &mut problems);
        }

        for key in &model.order_by {
            match self.catalog.property(&model.source, &key.property) {
                None => {
                    problems.insert(self.unknown_property(model, &key.property));
                }
                Some(def) if !def.orderable => {
                    problems.insert(format!("property '{}' is not orderable", key.property));
                }
                Some(_) => {}
            }
        }

        for problem in problems {
            ctx.add_problem(QueryPhase::Planning, problem);
        }

        let mut node = PlanNode::Access {
            selector: Selector::types(self.catalog.descendants(&model.source)),
        };
        if let Some(predicate) = &model.predicate {
            node = PlanNode::Filter {
                predicate: predicate.clone(),
                input: Box::new(node),
            };
        }
        node = PlanNode::Sort {
            keys: model.order_by.clone(),
            input: Box::new(node),
        };
        node = PlanNode::Limit {
            offset: model.paging.skip_count,
            limit: model.paging.max_items,
            input: Box::new(node),
        };
        node = PlanNode::Project {
            columns,
            input: Box::new(node),
        };

        Ok(ExecutionPlan::new(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PropertyDef, PropertyType, TypeDef};
    use folio_proto::{properties, OrderSpec, PagingParams};

    fn planner() -> CatalogPlanner {
        let mut catalog = TypeCatalog::cmis();
        let document = catalog.get("cmis:document").cloned().unwrap();
        catalog
            .register(
                TypeDef::subtype("acme:invoice", &document)
                    .with_property(PropertyDef::new("acme:scan", PropertyType::String).not_queryable()),
            )
            .unwrap();
        CatalogPlanner::new(Arc::new(catalog))
    }

    fn messages(ctx: &InvocationContext) -> Vec<String> {
        ctx.problems().iter().map(|p| p.message.clone()).collect()
    }

    #[test]
    fn test_canonical_plan() {
        let mut ctx = InvocationContext::anonymous();
        let model = QueryModel::select_all("cmis:document")
            .with_predicate(Predicate::eq(properties::NAME, "a"))
            .order_by(OrderSpec::asc(properties::NAME))
            .with_paging(PagingParams::max_items(5).skip(1));

        let plan = planner().create_plan(&mut ctx, &model).unwrap();
        assert!(!ctx.has_problems());
        assert_eq!(plan.shape(), vec!["Project", "Limit", "Sort", "Filter", "Access"]);
        assert_eq!(
            plan.access().unwrap().type_ids,
            vec!["cmis:document".to_string(), "acme:invoice".to_string()]
        );
        let columns = plan.columns().unwrap();
        assert_eq!(columns[0], properties::OBJECT_ID);
        assert!(columns.contains(&properties::CONTENT_STREAM_LENGTH.to_string()));
    }

    #[test]
    fn test_no_filter_without_predicate() {
        let mut ctx = InvocationContext::anonymous();
        let plan = planner()
            .create_plan(&mut ctx, &QueryModel::select_all("cmis:folder"))
            .unwrap();
        assert_eq!(plan.shape(), vec!["Project", "Limit", "Sort", "Access"]);
    }

    #[test]
    fn test_problems_recorded() {
        let mut ctx = InvocationContext::anonymous();
        let model = QueryModel::select_all("acme:invoice")
            .with_properties(["cmis:name", "acme:nope"])
            .with_predicate(Predicate::eq("acme:scan", "x"))
            .order_by(OrderSpec::desc(properties::BASE_TYPE_ID));

        planner().create_plan(&mut ctx, &model).unwrap();
        let found = messages(&ctx);
        assert_eq!(found.len(), 3);
        assert!(found.iter().any(|m| m.contains("unknown property 'acme:nope'")));
        assert!(found.iter().any(|m| m.contains("'acme:scan' is not queryable")));
        assert!(found.iter().any(|m| m.contains("is not orderable")));
        assert!(ctx
            .problems()
            .iter()
            .all(|p| p.phase == QueryPhase::Planning));
    }

    #[test]
    fn test_unknown_source_is_problem() {
        let mut ctx = InvocationContext::anonymous();
        let plan = planner()
            .create_plan(&mut ctx, &QueryModel::select_all("acme:missing"))
            .unwrap();
        assert_eq!(messages(&ctx), vec!["unknown source type 'acme:missing'"]);
        assert!(plan.access().unwrap().type_ids.is_empty());
    }
}
