#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{BuildError, RenderError};
    use pretty_assertions::assert_eq;

    fn pg() -> CriteriaBuilder {
        CriteriaBuilder::with_config(QueryConfig::with_flavor(Flavor::PostgreSQL))
    }

    fn sql(cb: &CriteriaBuilder) -> String {
        cb.render().unwrap().sql
    }

    #[test]
    fn select_new_orders_arguments_by_position() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .select_new("DocumentView")?
            .with("d.id")?
            .with_at(2, "d.name")?
            .with("d.age")?
            .end();
        assert_eq!(
            sql(&cb),
            "SELECT NEW DocumentView(d.id, d.name, d.age) FROM Document d"
        );
        Ok(())
    }

    #[test]
    fn select_new_rejects_duplicate_positions() -> Result<(), BuildError> {
        let res = pg()
            .from("Document", "d")?
            .select_new("DocumentView")?
            .with("d.id")?
            .with_at(0, "d.name");
        assert!(matches!(
            res,
            Err(BuildError::DuplicateSelectPosition { ref constructor, position: 0 })
                if constructor == "DocumentView"
        ));
        Ok(())
    }

    #[test]
    fn select_new_cannot_mix_with_plain_selections() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .select_new("DocumentView")?
            .with("d.id")?
            .end()
            .select("d.name")?;
        assert!(matches!(cb.render(), Err(RenderError::IllegalSelection(_))));
        Ok(())
    }

    #[test]
    fn default_join_replaces_path_prefixes() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .join_default("d.owner", JoinType::Left)?
            .select("d.owner.name")?
            .where_("owner.age")?
            .gt(30);
        assert_eq!(
            sql(&cb),
            "SELECT owner_1.name FROM Document d LEFT JOIN d.owner owner_1 WHERE owner_1.age > :param_0"
        );
        Ok(())
    }

    #[test]
    fn explicit_join_alias_is_kept() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .inner_join("d.owner", "o")?
            .select("o.name")?
            .select("d.owner.age")?;
        assert_eq!(
            sql(&cb),
            "SELECT o.name, d.owner.age FROM Document d JOIN d.owner o"
        );
        Ok(())
    }

    #[test]
    fn fetch_join_gets_a_generated_alias() -> Result<(), BuildError> {
        let cb = pg().from("Document", "d")?.fetch("d.versions")?;
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d LEFT JOIN FETCH d.versions versions_1"
        );
        Ok(())
    }

    #[test]
    fn unaliased_root_gets_generated_alias() -> Result<(), BuildError> {
        let cb = pg().from_entity("Document")?.select("name")?.where_("age")?.ge(18);
        assert_eq!(
            sql(&cb),
            "SELECT document_1.name FROM Document document_1 WHERE document_1.age >= :param_0"
        );
        Ok(())
    }

    #[test]
    fn multiple_roots_and_distinct() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .from("Person", "p")?
            .distinct()
            .select("d.name")?
            .select_as("p.name", "ownerName")?
            .where_("d.owner.id")?
            .eq_expression("p.id")?;
        assert_eq!(
            sql(&cb),
            "SELECT DISTINCT d.name, p.name AS ownerName FROM Document d, Person p WHERE d.owner.id = p.id"
        );
        Ok(())
    }

    #[test]
    fn query_without_roots_or_selection_is_empty() {
        assert_eq!(pg().render(), Err(RenderError::EmptyQuery));
    }

    #[test]
    fn select_without_from() -> Result<(), BuildError> {
        let cb = pg().select("CURRENT_TIMESTAMP")?;
        assert_eq!(sql(&cb), "SELECT CURRENT_TIMESTAMP");
        Ok(())
    }

    #[test]
    fn join_requires_a_root() {
        let res = pg().inner_join("d.owner", "o");
        assert!(matches!(res, Err(BuildError::MissingFrom { .. })));
    }
}
