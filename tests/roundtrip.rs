//! Integration tests for writing an archive and reading it back.

use std::sync::Arc;

use strata::prelude::*;

fn new_store() -> Arc<MemStore> {
    trace_init();
    Arc::new(MemStore::new())
}

/// Route library tracing into test output (`RUST_LOG=trace` to see it).
fn trace_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_roundtrip_hierarchy() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").expect("create");
        let mut root = writer.root().expect("root");
        let mut meta = MetaData::new();
        meta.set("kind", "group");
        let mut parent = root.add_child("parent", meta).expect("add parent");
        parent.add_child("nested", MetaData::new()).expect("add nested");
        root.add_child("sibling", MetaData::new()).expect("add sibling");
        writer.finish().expect("finish");
    }

    let archive = IArchive::open(store, "scene").expect("open");
    let root = archive.root();
    assert_eq!(root.num_children(), 2);
    assert_eq!(root.child_names(), ["parent", "sibling"]);

    let parent = root.child("parent").expect("parent");
    assert_eq!(parent.full_name(), "/parent");
    assert_eq!(parent.meta_data().get("kind"), Some("group"));
    assert_eq!(parent.num_children(), 1);
    assert_eq!(parent.child("nested").expect("nested").full_name(), "/parent/nested");
}

#[test]
fn test_roundtrip_scalar_samples() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let ts = writer.add_time_sampling(TimeSampling::uniform(0.5, 1.0).unwrap());
        let mut root = writer.root().unwrap();
        let mut props = root.properties();
        let mut speed = props
            .add_scalar(PropertyHeader::scalar("speed", DataType::FLOAT64).with_time_sampling(ts))
            .unwrap();
        for i in 0..4 {
            speed.append_typed(&(i as f64 * 10.0)).unwrap();
        }
        assert_eq!(speed.num_samples().unwrap(), 4);
        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    let speed = archive.root().properties().unwrap().scalar("speed").unwrap();
    assert_eq!(speed.num_samples().unwrap(), 4);
    for i in 0..4 {
        assert_eq!(speed.read_typed::<f64>(i).unwrap(), i as f64 * 10.0);
        assert!((speed.sample_time(i).unwrap() - (1.0 + i as f64 * 0.5)).abs() < 1e-12);
    }
}

#[test]
fn test_roundtrip_array_shapes() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let mut root = writer.root().unwrap();
        let mut props = root.properties();
        let mut grid = props
            .add_array(PropertyHeader::array("grid", DataType::INT32))
            .unwrap();
        // shape may change sample to sample
        grid.append(bytemuck::cast_slice(&[1i32, 2, 3, 4, 5, 6]), Dimensions::d2(2, 3))
            .unwrap();
        grid.append_typed::<i32>(&[7, 8]).unwrap();
        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    let grid = archive.root().properties().unwrap().array("grid").unwrap();
    assert_eq!(grid.num_samples().unwrap(), 2);
    assert_eq!(grid.sample_dimensions(0).unwrap(), Dimensions::d2(2, 3));
    assert_eq!(grid.sample_len(0).unwrap(), 6);
    assert_eq!(grid.read_i32s(0).unwrap(), [1, 2, 3, 4, 5, 6]);
    assert_eq!(grid.sample_dimensions(1).unwrap(), Dimensions::d1(2));
    assert_eq!(grid.read_i32s(1).unwrap(), [7, 8]);
}

#[test]
fn test_roundtrip_vector_extent() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let mut root = writer.root().unwrap();
        let mut props = root.properties();
        let mut points = props
            .add_array(PropertyHeader::array("P", DataType::VEC3F))
            .unwrap();
        points
            .append_typed::<f32>(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0])
            .unwrap();
        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    let points = archive.root().properties().unwrap().array("P").unwrap();
    // two Vec3f elements
    assert_eq!(points.sample_len(0).unwrap(), 2);
    assert_eq!(points.read_f32s(0).unwrap(), [0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_append_from_previous_and_is_constant() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let mut root = writer.root().unwrap();
        let mut props = root.properties();

        let mut constant = props
            .add_scalar(PropertyHeader::scalar("constant", DataType::INT32))
            .unwrap();
        constant.append_typed(&7i32).unwrap();
        constant.append_from_previous().unwrap();
        constant.append_from_previous().unwrap();

        let mut varying = props
            .add_scalar(PropertyHeader::scalar("varying", DataType::INT32))
            .unwrap();
        varying.append_typed(&1i32).unwrap();
        varying.append_typed(&2i32).unwrap();

        // duplicating before any sample exists is an error
        let mut empty = props
            .add_scalar(PropertyHeader::scalar("empty", DataType::INT32))
            .unwrap();
        assert!(matches!(
            empty.append_from_previous(),
            Err(Error::SampleOutOfBounds { .. })
        ));

        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    let props = archive.root().properties().unwrap();
    let constant = props.scalar("constant").unwrap();
    assert_eq!(constant.num_samples().unwrap(), 3);
    assert_eq!(constant.read_typed::<i32>(2).unwrap(), 7);
    assert!(constant.is_constant().unwrap());
    assert!(!props.scalar("varying").unwrap().is_constant().unwrap());
}

#[test]
fn test_roundtrip_strings() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let mut root = writer.root().unwrap();
        let mut props = root.properties();
        let mut note = props
            .add_scalar(PropertyHeader::scalar("note", DataType::STRING))
            .unwrap();
        note.append_str("hello archive").unwrap();
        let mut names = props
            .add_array(PropertyHeader::array("names", DataType::STRING))
            .unwrap();
        names.append_strings(&["left", "right", "center"]).unwrap();
        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    let props = archive.root().properties().unwrap();
    assert_eq!(props.scalar("note").unwrap().read_str(0).unwrap(), "hello archive");
    assert_eq!(
        props.array("names").unwrap().read_strings(0).unwrap(),
        ["left", "right", "center"]
    );
}

#[test]
fn test_archive_info() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        writer.set_application("unit-test exporter");
        writer.set_writer_version("0.1.0");
        writer.set_date_written("2024-06-01T12:00:00Z");
        writer.set_user_description("round-trip fixture");
        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    assert_eq!(archive.application(), Some("unit-test exporter"));
    assert_eq!(archive.writer_version(), Some("0.1.0"));
    assert_eq!(archive.date_written(), Some("2024-06-01T12:00:00Z"));
    assert_eq!(archive.user_description(), Some("round-trip fixture"));
}

#[test]
fn test_time_sampling_registry() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let uniform = TimeSampling::uniform(1.0 / 24.0, 0.0).unwrap();
        let acyclic = TimeSampling::acyclic(vec![0.0, 0.4, 2.0]).unwrap();

        let a = writer.add_time_sampling(uniform.clone());
        let b = writer.add_time_sampling(acyclic.clone());
        // deduplication: re-adding an equal sampling returns the old index
        assert_eq!(writer.add_time_sampling(uniform.clone()), a);
        assert_eq!(writer.add_time_sampling(acyclic.clone()), b);
        assert_eq!(writer.num_time_samplings(), 3);

        let mut root = writer.root().unwrap();
        let mut props = root.properties();
        let mut p = props
            .add_scalar(PropertyHeader::scalar("animated", DataType::FLOAT32).with_time_sampling(a))
            .unwrap();
        for i in 0..5 {
            p.append_typed(&(i as f32)).unwrap();
        }
        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    assert_eq!(archive.num_time_samplings(), 3);
    assert!(archive.time_sampling(0).unwrap().is_identity());
    assert_eq!(
        archive.time_sampling(1),
        Some(&TimeSampling::uniform(1.0 / 24.0, 0.0).unwrap())
    );
    assert_eq!(archive.max_num_samples_for_time_sampling(1), Some(5));

    let animated = archive.root().properties().unwrap().scalar("animated").unwrap();
    assert_eq!(
        animated.time_sampling().unwrap(),
        TimeSampling::uniform(1.0 / 24.0, 0.0).unwrap()
    );
}

#[test]
fn test_sample_selectors() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let ts = writer.add_time_sampling(TimeSampling::uniform(1.0, 0.0).unwrap());
        let mut root = writer.root().unwrap();
        let mut props = root.properties();
        let mut p = props
            .add_scalar(PropertyHeader::scalar("v", DataType::INT32).with_time_sampling(ts))
            .unwrap();
        for i in 0..4 {
            p.append_typed(&(i as i32)).unwrap();
        }
        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    let p = archive.root().properties().unwrap().scalar("v").unwrap();
    let at = |sel: SampleSelector| -> i32 {
        bytemuck::pod_read_unaligned(&p.sample_by(sel).unwrap().data)
    };
    assert_eq!(at(SampleSelector::TimeFloor(2.7)), 2);
    assert_eq!(at(SampleSelector::TimeCeil(2.3)), 3);
    assert_eq!(at(SampleSelector::TimeNear(0.9)), 1);
    assert_eq!(at(SampleSelector::Index(0)), 0);
    // clamping outside the sampled range
    assert_eq!(at(SampleSelector::TimeFloor(99.0)), 3);
    assert_eq!(at(SampleSelector::TimeCeil(-99.0)), 0);
}

#[test]
fn test_child_lookup_is_idempotent() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let mut root = writer.root().unwrap();
        let mut x = root.add_child("x", MetaData::new()).unwrap();
        let mut props = x.properties();
        props
            .add_scalar(PropertyHeader::scalar("v", DataType::INT32))
            .unwrap()
            .append_typed(&1i32)
            .unwrap();
        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    let root = archive.root();

    // two live lookups are referentially identical
    let a = root.child("x").unwrap();
    let b = root.child("x").unwrap();
    assert!(a.same_instance(&b));

    let pa = a.properties().unwrap();
    let pb = b.properties().unwrap();
    assert!(pa.same_instance(&pb));
    assert!(pa
        .scalar("v")
        .unwrap()
        .same_instance(&pb.scalar("v").unwrap()));

    // release every handle, then look up again: the entry was collected
    // and rebuilt, and the rebuilt instance is content-equal
    let digest_before = a.digest().unwrap();
    drop((a, b, pa, pb));
    let rebuilt = root.child("x").unwrap();
    assert_eq!(rebuilt.name(), "x");
    assert_eq!(rebuilt.digest().unwrap(), digest_before);
}

#[test]
fn test_lookup_errors() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let mut root = writer.root().unwrap();
        root.add_child("x", MetaData::new()).unwrap();
        let mut props = root.properties();
        props
            .add_array(PropertyHeader::array("arr", DataType::FLOAT32))
            .unwrap();
        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    let root = archive.root();
    assert!(matches!(
        root.child("missing"),
        Err(Error::ObjectNotFound(_))
    ));
    assert!(matches!(
        root.child_at(5),
        Err(Error::ChildOutOfBounds { index: 5, count: 1 })
    ));

    let props = root.properties().unwrap();
    assert!(matches!(
        props.property("missing"),
        Err(Error::PropertyNotFound(_))
    ));
    // wrong kind requested
    assert!(matches!(props.scalar("arr"), Err(Error::TypeMismatch { .. })));
    // bad sample index
    let arr = props.array("arr").unwrap();
    assert!(matches!(
        arr.get(0),
        Err(Error::SampleOutOfBounds { index: 0, count: 0 })
    ));
}

#[test]
fn test_find_object() {
    let store = new_store();
    {
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let mut root = writer.root().unwrap();
        let mut a = root.add_child("a", MetaData::new()).unwrap();
        a.add_child("b", MetaData::new()).unwrap();
        writer.finish().unwrap();
    }

    let archive = IArchive::open(store, "scene").unwrap();
    let found = archive.find_object("/a/b").unwrap().expect("should exist");
    assert_eq!(found.full_name(), "/a/b");
    assert!(archive.has_object("a").unwrap());
    assert!(!archive.has_object("/a/zzz").unwrap());
    assert!(archive.find_object("/a/zzz/deeper").unwrap().is_none());
}

#[test]
fn test_open_unfinished_store_fails_fast() {
    let store = new_store();
    {
        // never call finish(): no version, metadata or registry persisted
        let writer = OArchive::create(store.clone(), "scene").unwrap();
        drop(writer);
    }
    assert!(matches!(
        IArchive::open(store, "scene"),
        Err(Error::MalformedDirectory(_))
    ));
}

#[test]
fn test_open_rejects_bad_version_and_registry() {
    use strata::store::{Store, ARCHIVE_SAMPLINGS_KEY, ARCHIVE_VERSION_KEY};

    let store = new_store();
    {
        let writer = OArchive::create(store.clone(), "scene").unwrap();
        writer.finish().unwrap();
    }

    store
        .set_attr(store.root(), ARCHIVE_VERSION_KEY, "99".into())
        .unwrap();
    assert!(matches!(
        IArchive::open(store.clone(), "scene"),
        Err(Error::UnsupportedVersion(99))
    ));

    store
        .set_attr(store.root(), ARCHIVE_VERSION_KEY, "1".into())
        .unwrap();
    store
        .set_attr(store.root(), ARCHIVE_SAMPLINGS_KEY, vec![1u8, 2, 3].into())
        .unwrap();
    assert!(matches!(
        IArchive::open(store, "scene"),
        Err(Error::MalformedDirectory(_))
    ));
}

#[test]
fn test_closed_nodes_reject_children() {
    let store = new_store();
    let mut writer = OArchive::create(store.clone(), "scene").unwrap();
    let mut root = writer.root().unwrap();
    let mut props = root.properties();
    props
        .add_scalar(PropertyHeader::scalar("v", DataType::INT32))
        .unwrap();
    props.close();
    assert!(matches!(
        props.add_scalar(PropertyHeader::scalar("w", DataType::INT32)),
        Err(Error::Frozen)
    ));

    root.close();
    assert!(matches!(
        root.add_child("late", MetaData::new()),
        Err(Error::Frozen)
    ));
    writer.finish().unwrap();
}

#[test]
fn test_duplicate_names_rejected() {
    let store = new_store();
    let mut writer = OArchive::create(store.clone(), "scene").unwrap();
    let mut root = writer.root().unwrap();
    root.add_child("dup", MetaData::new()).unwrap();
    assert!(matches!(
        root.add_child("dup", MetaData::new()),
        Err(Error::WriteFailed(_))
    ));

    let mut props = root.properties();
    props
        .add_scalar(PropertyHeader::scalar("p", DataType::INT32))
        .unwrap();
    assert!(matches!(
        props.add_array(PropertyHeader::array("p", DataType::INT32)),
        Err(Error::WriteFailed(_))
    ));
    writer.finish().unwrap();
}

#[test]
fn test_digest_tracks_content() {
    let build = |flavor: i32| -> IArchive {
        let store = new_store();
        let mut writer = OArchive::create(store.clone(), "scene").unwrap();
        let mut root = writer.root().unwrap();
        let mut x = root.add_child("x", MetaData::new()).unwrap();
        let mut props = x.properties();
        let mut p = props
            .add_scalar(PropertyHeader::scalar("v", DataType::INT32))
            .unwrap();
        p.append_typed(&flavor).unwrap();
        writer.finish().unwrap();
        IArchive::open(store, "scene").unwrap()
    };

    let a = build(1);
    let b = build(1);
    let c = build(2);
    assert_eq!(a.root().digest().unwrap(), b.root().digest().unwrap());
    assert_ne!(a.root().digest().unwrap(), c.root().digest().unwrap());
}
