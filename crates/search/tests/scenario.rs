use std::sync::Arc;

use kubeset_core::Record;
use kubeset_search::{filter_records, order_records, Q};
use uuid::Uuid;

fn pod(name: &str, ns: &str, app: &str, env: &str) -> Arc<Record> {
    let mut r = Record::new(name);
    r.uid = Some(Uuid::new_v4());
    r.namespace = Some(ns.to_string());
    r.labels.insert("app".into(), app.into());
    r.labels.insert("env".into(), env.into());
    Arc::new(r)
}

fn pods() -> Vec<Arc<Record>> {
    vec![
        pod("pod1", "default", "myapp", "prod"),
        pod("pod2", "kube-system", "system", "prod"),
        pod("pod3", "default", "myapp", "dev"),
    ]
}

fn names(records: &[Arc<Record>]) -> Vec<&str> {
    records.iter().map(|r| r.name.as_str()).collect()
}

#[test]
fn chained_filters_narrow() {
    let all = pods();
    let step = filter_records(&Q::new("namespace", "default"), &all);
    let out = filter_records(&Q::new("labels__app", "myapp"), &step);
    assert_eq!(names(&out), vec!["pod1", "pod3"]);
}

#[test]
fn negation_is_complement() {
    let all = pods();
    let out = filter_records(&!Q::new("namespace", "kube-system"), &all);
    assert_eq!(names(&out), vec!["pod1", "pod3"]);
}

#[test]
fn and_or_not_compose() {
    let all = pods();
    let q = (Q::new("labels__env", "prod") & Q::new("namespace", "default")) | Q::new("name__startswith", "pod3");
    assert_eq!(names(&filter_records(&q, &all)), vec!["pod1", "pod3"]);

    let q = Q::new("labels__env__in", vec!["dev", "staging"]) | Q::new("labels__app__icontains", "SYS");
    assert_eq!(names(&filter_records(&q, &all)), vec!["pod2", "pod3"]);

    let q = Q::from_pairs([("namespace", "default"), ("labels__env", "dev")]);
    assert_eq!(names(&filter_records(&q, &all)), vec!["pod3"]);
}

#[test]
fn uid_lookup_accepts_string_form() {
    let all = pods();
    let uid = all[1].uid.unwrap();
    let out = filter_records(&Q::new("pk", uid.to_string()), &all);
    assert_eq!(names(&out), vec!["pod2"]);
    let out = filter_records(&Q::new("uid", uid), &all);
    assert_eq!(names(&out), vec!["pod2"]);
}

#[test]
fn order_by_label_then_name() {
    let mut all = pods();
    order_records(&mut all, &["labels__app", "name"]);
    assert_eq!(names(&all), vec!["pod1", "pod3", "pod2"]);
    order_records(&mut all, &["-name"]);
    assert_eq!(names(&all), vec!["pod3", "pod2", "pod1"]);
}
