#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{BuildError, RenderError};
    use pretty_assertions::assert_eq;

    fn pg() -> CriteriaBuilder {
        CriteriaBuilder::with_config(QueryConfig::with_flavor(Flavor::PostgreSQL))
    }

    fn sql(cb: &CriteriaBuilder) -> String {
        let sql = cb.render().unwrap().sql;
        assert!(!sql.contains("__subquery_"), "leftover placeholder in {sql}");
        sql
    }

    #[test]
    fn correlated_exists() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_exists()
            .from("Person", "p")?
            .where_("p.id")?
            .eq_expression("d.owner.id")?
            .end();
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE EXISTS (SELECT p FROM Person p WHERE p.id = d.owner.id)"
        );
        Ok(())
    }

    #[test]
    fn not_exists_in_a_group() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_or()
            .where_("d.owner")?
            .is_null()
            .where_not_exists()
            .from("Person", "p")?
            .where_("p.id")?
            .eq_expression("d.owner.id")?
            .end()
            .end_or();
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE d.owner IS NULL \
             OR NOT EXISTS (SELECT p FROM Person p WHERE p.id = d.owner.id)"
        );
        Ok(())
    }

    #[test]
    fn parameters_are_numbered_in_text_order() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.age")?
            .gt(1)
            .where_("d.owner.id")?
            .in_subquery()
            .from("Person", "p")?
            .select("p.id")?
            .where_("p.age")?
            .gt(2)
            .end()
            .where_("d.size")?
            .lt(3);
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE d.age > :param_0 \
             AND d.owner.id IN (SELECT p.id FROM Person p WHERE p.age > :param_1) \
             AND d.size < :param_2"
        );
        Ok(())
    }

    #[test]
    fn nested_subqueries_resolve_outer_aliases() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.owner.id")?
            .not_in_subquery()
            .from("Person", "p")?
            .select("p.id")?
            .where_exists()
            .from("Version", "v")?
            .where_("v.author")?
            .eq_expression("p")?
            .where_("v.document")?
            .eq_expression("d")?
            .end()
            .end();
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE d.owner.id NOT IN (SELECT p.id FROM Person p \
             WHERE EXISTS (SELECT v FROM Version v WHERE v.author = p AND v.document = d))"
        );
        Ok(())
    }

    #[test]
    fn subquery_in_select_with_alias() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .select("d.name")?
            .select_subquery(Some("versions"))
            .from("Version", "v")?
            .select("COUNT(v.id)")?
            .where_("v.document")?
            .eq_expression("d")?
            .end();
        assert_eq!(
            sql(&cb),
            "SELECT d.name, (SELECT COUNT(v.id) FROM Version v WHERE v.document = d) AS versions \
             FROM Document d"
        );
        Ok(())
    }

    #[test]
    fn quantified_comparison() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.age")?
            .ge_all()
            .from("Person", "p")?
            .select("p.age")?
            .end()
            .where_("d.size")?
            .lt_any()
            .from("Version", "v")?
            .select("v.size")?
            .end();
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE d.age >= ALL (SELECT p.age FROM Person p) \
             AND d.size < ANY (SELECT v.size FROM Version v)"
        );
        Ok(())
    }

    #[test]
    fn subquery_as_left_hand_side() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_subquery()
            .from("Version", "v")?
            .select("COUNT(v.id)")?
            .where_("v.document")?
            .eq_expression("d")?
            .end()
            .gt(3);
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE (SELECT COUNT(v.id) FROM Version v WHERE v.document = d) > :param_0"
        );
        Ok(())
    }

    #[test]
    fn multiple_subqueries_fill_a_template() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .select_subqueries("a + b", Some("total"))?
            .with("a")?
            .from("Version", "v")?
            .select("COUNT(v.id)")?
            .end()
            .with("b")?
            .from("Person", "p")?
            .select("COUNT(p.id)")?
            .end()
            .end();
        assert_eq!(
            sql(&cb),
            "SELECT (SELECT COUNT(v.id) FROM Version v) + (SELECT COUNT(p.id) FROM Person p) AS total \
             FROM Document d"
        );
        Ok(())
    }

    #[test]
    fn repeated_alias_fills_every_occurrence() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .select_subqueries("a + a", Some("t"))?
            .with("a")?
            .from("Person", "p")?
            .select("COUNT(p.id)")?
            .end()
            .end();
        assert_eq!(
            sql(&cb),
            "SELECT (SELECT COUNT(p.id) FROM Person p) + (SELECT COUNT(p.id) FROM Person p) AS t \
             FROM Document d"
        );
        Ok(())
    }

    #[test]
    fn subqueries_on_the_right_hand_side() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.age")?
            .gt_subqueries("x * 2")?
            .with("x")?
            .from("Person", "p")?
            .select("MAX(p.age)")?
            .end()
            .end();
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE d.age > (SELECT MAX(p.age) FROM Person p) * 2"
        );
        Ok(())
    }

    #[test]
    fn subquery_aliases_are_checked() -> Result<(), BuildError> {
        let unknown = pg()
            .from("Document", "d")?
            .select_subqueries("a + b", None)?
            .with("c");
        assert!(matches!(unknown, Err(BuildError::UnknownSubqueryAlias { .. })));

        let duplicate = pg()
            .from("Document", "d")?
            .select_subqueries("a + b", None)?
            .with("a")?
            .from("Person", "p")?
            .end()
            .with("a");
        assert!(matches!(duplicate, Err(BuildError::DuplicateSubqueryAlias { .. })));
        Ok(())
    }

    #[test]
    fn unreferenced_alias_in_a_model_fails_to_render() -> Result<(), BuildError> {
        use crate::expr::{Expr, NamedSubquery};
        use crate::model::QueryModel;

        let cb = pg().from("Document", "d")?.select_expr(
            Expr::Composite {
                template: "a + 1".to_string(),
                subqueries: vec![NamedSubquery {
                    alias: "b".to_string(),
                    query: QueryModel::new(),
                }],
            },
            None,
        );
        assert_eq!(
            cb.render(),
            Err(RenderError::UnreferencedSubqueryAlias {
                alias: "b".to_string(),
                template: "a + 1".to_string(),
            })
        );
        Ok(())
    }
}
