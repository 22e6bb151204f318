//! End-to-end scenarios from spec §8, exercised through the public
//! `Table`/`Tree` surface exactly as the spec phrases them.

use jsondb::predicate::ge;
use jsondb::Table;

#[test]
fn scenario_1_insert_and_jsonpath_read() {
    let mut t = Table::create("students");
    t.insert(r#"{"name":"张三","age":1}"#).unwrap();
    let table = t.table().unwrap();
    assert_eq!(t.tree_mut().get::<String>(table, "$1.name"), "张三");
    assert_eq!(t.tree_mut().get::<i64>(table, "$1.age"), 1);
}

#[test]
fn scenario_2_update_via_path() {
    let mut t = Table::create("students");
    t.insert(r#"{"name":"张三","age":1}"#).unwrap();
    let table = t.table().unwrap();
    let n = t.tree_mut().get_node(table, "$1").unwrap();
    t.tree_mut().set(n, "name", "李四").unwrap();
    assert_eq!(t.tree_mut().get::<String>(table, "$1.name"), "李四");
}

#[test]
fn scenario_3_predicate_filter_preserves_insertion_order() {
    let mut t = Table::create("students");
    t.insert(r#"{"age":10}"#).unwrap();
    t.insert(r#"{"age":15}"#).unwrap();
    t.insert(r#"{"age":20}"#).unwrap();
    let matches = t.filter(ge::<i64>("age", 15)).unwrap();
    let ages: Vec<i64> = matches
        .into_iter()
        .map(|n| t.tree_mut().get::<i64>(n, "age"))
        .collect();
    assert_eq!(ages, vec![15, 20]);
}

#[test]
fn scenario_4_multi_index_range_find() {
    let mut t = Table::create("students");
    t.add_index("age", false, vec!["age".to_string()]).unwrap();
    for age in [10, 12, 15, 20, 25] {
        t.insert(&format!(r#"{{"age":{age}}}"#)).unwrap();
    }
    let found = t.range_find("age", "12", "20").unwrap();
    let mut ages: Vec<i64> = found
        .into_iter()
        .map(|n| t.tree_mut().get::<i64>(n, "age"))
        .collect();
    ages.sort();
    assert_eq!(ages, vec![12, 15, 20]);
}

#[test]
fn scenario_5_round_trip_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.db");

    let mut t = Table::create("students");
    t.insert(r#"{"name":"张三","age":1}"#).unwrap();
    t.insert(r#"{"name":"李四","age":2}"#).unwrap();
    t.serialize(&path, true).unwrap();

    let mut reloaded = Table::load("students", &path, true).unwrap();
    let table = t.table().unwrap();
    let reloaded_table = reloaded.table().unwrap();
    for n in 1..=2 {
        let path_expr = format!("${n}.name");
        assert_eq!(
            t.tree_mut().get::<String>(table, &path_expr),
            reloaded.tree_mut().get::<String>(reloaded_table, &path_expr)
        );
        let age_path = format!("${n}.age");
        assert_eq!(
            t.tree_mut().get::<i64>(table, &age_path),
            reloaded.tree_mut().get::<i64>(reloaded_table, &age_path)
        );
    }
}

#[test]
fn scenario_6_composite_prefix() {
    let mut t = Table::create("students");
    t.add_index(
        "name_sex",
        false,
        vec!["name".to_string(), "sex".to_string()],
    )
    .unwrap();
    t.insert(r#"{"name":"张三1","sex":"male"}"#).unwrap();
    t.insert(r#"{"name":"张三2","sex":"female"}"#).unwrap();

    let both = t.left_find("name_sex", &["张三".to_string()]).unwrap();
    assert_eq!(both.len(), 2);

    let only_first = t.left_find("name_sex", &["张三1".to_string()]).unwrap();
    assert_eq!(only_first.len(), 1);
}
