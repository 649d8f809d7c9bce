#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::BuildError;
    use pretty_assertions::assert_eq;

    fn pg() -> CriteriaBuilder {
        CriteriaBuilder::with_config(QueryConfig::with_flavor(Flavor::PostgreSQL))
    }

    fn sql(cb: &CriteriaBuilder) -> String {
        cb.render().unwrap().sql
    }

    #[test]
    fn between_frame_with_exclusion() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .select("d.name")?
            .window("w")?
            .partition_by("d.owner")?
            .order_by_asc("d.age")?
            .rows()
            .between_unbounded_preceding()
            .and_current_row()
            .exclude_ties();
        assert_eq!(
            sql(&cb),
            "SELECT d.name FROM Document d WINDOW w AS (PARTITION BY d.owner ORDER BY d.age ASC NULLS LAST \
             ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW EXCLUDE TIES)"
        );
        Ok(())
    }

    #[test]
    fn frame_offsets_are_parameters() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .window("a")?
            .order_by_desc("d.id")?
            .range()
            .preceding_value(3)
            .end()
            .window("b")?
            .groups()
            .between_preceding("2")?
            .and_following_value(1)
            .exclude_current_row();
        let q = cb.render().unwrap();
        assert_eq!(
            q.sql,
            "SELECT d FROM Document d WINDOW a AS (ORDER BY d.id DESC NULLS LAST RANGE :param_0 PRECEDING), \
             b AS (GROUPS BETWEEN :param_1 PRECEDING AND :param_2 FOLLOWING EXCLUDE CURRENT ROW)"
        );
        assert_eq!(q.bindings.get("param_0"), Some(&SqlValue::U64(3)));
        assert_eq!(q.bindings.get("param_1"), Some(&SqlValue::I64(2)));
        Ok(())
    }

    #[test]
    fn window_without_frame() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .window("w")?
            .partition_by_all(vec!["d.owner".to_string(), "d.kind".to_string()])?
            .end();
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WINDOW w AS (PARTITION BY d.owner, d.kind)"
        );
        Ok(())
    }

    #[test]
    fn single_bound_frames() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .window("w")?
            .rows()
            .current_row()
            .exclude_no_others();
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WINDOW w AS (ROWS CURRENT ROW EXCLUDE NO OTHERS)"
        );
        Ok(())
    }

    #[test]
    fn window_names_are_unique() -> Result<(), BuildError> {
        let cb = pg().from("Document", "d")?.window("w")?.end();
        assert!(matches!(cb.window("w"), Err(BuildError::DuplicateWindow { .. })));
        Ok(())
    }
}
