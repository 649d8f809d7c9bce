#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{BuildError, KeysetMode, RenderError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pg() -> CriteriaBuilder {
        CriteriaBuilder::with_config(QueryConfig::with_flavor(Flavor::PostgreSQL))
    }

    fn sql(cb: &CriteriaBuilder) -> String {
        cb.render().unwrap().sql
    }

    /// 两列升序、NULL 在前，keyset 谓词里不会出现 IS NULL 分支。
    fn ordered(cb: CriteriaBuilder) -> Result<CriteriaBuilder, BuildError> {
        cb.from("Document", "d")?
            .order_by("d.age", true, true)?
            .order_by("d.id", true, true)
    }

    #[test]
    fn after_keyset_expands_level_by_level() -> Result<(), BuildError> {
        let cb = ordered(pg())?.after_keyset(crate::keyset![30, 7])?;
        let q = cb.render().unwrap();
        assert_eq!(
            q.sql,
            "SELECT d FROM Document d \
             WHERE d.age > :keyset_0 OR (d.age = :keyset_0 AND d.id > :keyset_1) \
             ORDER BY d.age ASC NULLS FIRST, d.id ASC NULLS FIRST"
        );
        assert_eq!(q.bindings.get("keyset_0"), Some(&SqlValue::I64(30)));
        assert_eq!(q.bindings.get("keyset_1"), Some(&SqlValue::I64(7)));
        Ok(())
    }

    #[test]
    fn optimized_predicate_leads_with_a_range() -> Result<(), BuildError> {
        let config = QueryConfig::with_flavor(Flavor::PostgreSQL).optimized_keyset_predicate(true);
        let cb = ordered(CriteriaBuilder::with_config(config))?.after_keyset(crate::keyset![30, 7])?;
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d \
             WHERE d.age >= :keyset_0 AND (d.age > :keyset_0 OR d.id > :keyset_1) \
             ORDER BY d.age ASC NULLS FIRST, d.id ASC NULLS FIRST"
        );
        Ok(())
    }

    #[test]
    fn keyset_predicate_joins_existing_where() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .where_("d.owner.age")?
            .gt(18)
            .order_by("d.id", true, true)?
            .after_keyset(crate::keyset![7])?;
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE d.owner.age > :param_0 AND d.id > :keyset_0 \
             ORDER BY d.id ASC NULLS FIRST"
        );
        Ok(())
    }

    #[test]
    fn nulls_last_includes_null_rows_after_values() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .order_by_asc("d.age")?
            .after_keyset(crate::keyset![30])?;
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE d.age > :keyset_0 OR d.age IS NULL \
             ORDER BY d.age ASC NULLS LAST"
        );
        Ok(())
    }

    #[test]
    fn null_values_become_null_checks() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .order_by_asc("d.age")?
            .order_by("d.id", true, true)?
            .after_keyset(crate::keyset![SqlValue::Null, 5])?;
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE d.age IS NULL AND d.id > :keyset_0 \
             ORDER BY d.age ASC NULLS LAST, d.id ASC NULLS FIRST"
        );
        Ok(())
    }

    #[test]
    fn before_keyset_inverts_the_order() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .order_by("d.id", true, true)?
            .before_keyset(crate::keyset![7])?;
        assert_eq!(
            sql(&cb),
            "SELECT d FROM Document d WHERE d.id < :keyset_0 OR d.id IS NULL \
             ORDER BY d.id DESC NULLS LAST"
        );
        Ok(())
    }

    #[test]
    fn keyset_width_must_match_order_by() -> Result<(), BuildError> {
        let err = pg()
            .from("Document", "d")?
            .order_by_asc("d.a")?
            .order_by_asc("d.b")?
            .order_by_asc("d.id")?
            .after_keyset(crate::keyset![1, 2])
            .unwrap_err();
        assert_eq!(err, BuildError::KeysetShapeMismatch { expected: 3, actual: 2 });
        Ok(())
    }

    #[test]
    fn order_by_added_after_the_keyset_fails_to_render() -> Result<(), BuildError> {
        let cb = pg()
            .from("Document", "d")?
            .order_by_asc("d.name")?
            .after_keyset(crate::keyset!["x"])?
            .order_by_asc("d.id")?;
        assert_eq!(
            cb.render(),
            Err(RenderError::KeysetShapeMismatch { expected: 2, actual: 1 })
        );
        Ok(())
    }

    #[test]
    fn keyset_builder_places_values_by_expression() -> Result<(), BuildError> {
        let cb = ordered(pg())?
            .after_keyset_builder()
            .with("d.id", 7)?
            .with("d.age", 30)?
            .end()?;
        assert_eq!(
            cb.model().keyset.as_ref().map(|k| k.keyset.clone()),
            Some(crate::keyset![30, 7])
        );

        let unknown = ordered(pg())?.after_keyset_builder().with("d.name", 1);
        assert!(matches!(unknown, Err(BuildError::UnknownKeysetExpression { .. })));

        let duplicate = ordered(pg())?
            .after_keyset_builder()
            .with("d.id", 1)?
            .with("d.id", 2);
        assert!(matches!(duplicate, Err(BuildError::DuplicateKeysetExpression { .. })));

        let missing = ordered(pg())?.before_keyset_builder().with("d.id", 1)?.end();
        assert!(matches!(
            missing,
            Err(BuildError::KeysetShapeMismatch { expected: 2, actual: 1 })
        ));
        Ok(())
    }

    #[test]
    fn page_reference_decides_the_mode() {
        let page = KeysetPage::new(20, 10, Some(crate::keyset![5]), Some(crate::keyset![14]));
        assert_eq!(page.keyset_mode(20, 10, 1), KeysetMode::Same);
        assert_eq!(page.keyset_mode(30, 10, 1), KeysetMode::Next);
        assert_eq!(page.keyset_mode(10, 10, 1), KeysetMode::Previous);
        assert_eq!(page.keyset_mode(50, 10, 1), KeysetMode::None);
        assert_eq!(page.keyset_mode(30, 20, 1), KeysetMode::None);
        assert_eq!(page.keyset_mode(30, 10, 2), KeysetMode::None);
        assert_eq!(page.keyset_mode(30, 10, 0), KeysetMode::None);

        let empty = KeysetPage::new(0, 10, None, None);
        assert_eq!(empty.keyset_mode(10, 10, 1), KeysetMode::None);
    }

    #[test]
    fn keyset_page_wire_shape() {
        let page = KeysetPage::new(20, 10, Some(crate::keyset![1]), Some(crate::keyset![9, "z"]));
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(
            value,
            json!({
                "firstResult": 20,
                "maxResults": 10,
                "lowestTuple": [{"i64": 1}],
                "highestTuple": [{"i64": 9}, {"string": "z"}],
                "allTuples": [],
            })
        );

        let back: KeysetPage = serde_json::from_value(json!({
            "firstResult": 20,
            "maxResults": 10,
            "lowestTuple": [{"i64": 1}],
            "highestTuple": null,
        }))
        .unwrap();
        assert_eq!(back, KeysetPage::new(20, 10, Some(crate::keyset![1]), None));
    }
}
