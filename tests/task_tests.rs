use burrow::core::{ChmodSpec, ConflictPolicy, Phase, Task, TaskError, TaskFlags, TaskKind};
use rand::Rng;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::{PermissionsExt, symlink};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

type Snapshot = BTreeMap<PathBuf, Option<Vec<u8>>>;

fn names(list: &[&str]) -> Vec<OsString> {
    list.iter().map(OsString::from).collect()
}

/// Relative path -> file contents (None for directories).
fn snapshot(root: &Path) -> std::io::Result<Snapshot> {
    let mut out = BTreeMap::new();
    collect(root, root, &mut out)?;
    Ok(out)
}

fn collect(base: &Path, dir: &Path, out: &mut Snapshot) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let rel = path.strip_prefix(base).unwrap_or(&path).to_path_buf();
        if fs::symlink_metadata(&path)?.is_dir() {
            out.insert(rel, None);
            collect(base, &path, out)?;
        } else {
            out.insert(rel, Some(fs::read(&path)?));
        }
    }
    Ok(())
}

fn random_tree(root: &Path, rng: &mut impl Rng, depth: usize) -> std::io::Result<()> {
    for i in 0..rng.random_range(1..5) {
        let path = root.join(format!("n{}", i));
        if depth > 0 && rng.random_bool(0.4) {
            fs::create_dir(&path)?;
            random_tree(&path, rng, depth - 1)?;
        } else {
            let mut data = vec![0u8; rng.random_range(0..200)];
            rng.fill(&mut data[..]);
            fs::write(&path, data)?;
        }
    }
    Ok(())
}

/// Tick until the task stops, with a fresh random budget every call.
fn run_random(task: &mut Task, rng: &mut impl Rng) {
    let mut calls = 0;
    while task.is_running() {
        task.tick(rng.random_range(1..=7));
        calls += 1;
        assert!(calls < 1_000_000, "task never finished");
    }
}

fn run(task: &mut Task, budget: usize) {
    let mut calls = 0;
    while task.is_running() {
        task.tick(budget);
        calls += 1;
        assert!(calls < 1_000_000, "task never finished");
    }
}

#[test]
fn test_copy_random_trees_with_random_budgets() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::rng();
    for _ in 0..6 {
        let src = tempdir()?;
        let dst = tempdir()?;
        fs::create_dir(src.path().join("tree"))?;
        random_tree(&src.path().join("tree"), &mut rng, 3)?;

        let mut task = Task::new(
            TaskKind::Copy,
            TaskFlags::NONE,
            src.path(),
            dst.path(),
            names(&["tree"]),
            Vec::new(),
        )?
        .with_buffer_size(7);
        run_random(&mut task, &mut rng);

        assert_eq!(task.phase(), Phase::Done);
        assert_eq!(snapshot(src.path())?, snapshot(dst.path())?);
        let p = task.progress();
        assert_eq!(p.files_done, p.files_total);
        assert_eq!(p.dirs_done, p.dirs_total);
        assert_eq!(p.size_done, p.size_total);
        assert_eq!(task.bytes_copied(), p.size_total);
    }
    Ok(())
}

#[test]
fn test_copy_with_skip_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    fs::create_dir_all(src.path().join("docs/sub"))?;
    fs::write(src.path().join("docs/a.txt"), "alpha")?;
    fs::write(src.path().join("docs/sub/b.txt"), "beta")?;

    let copy = || {
        Task::new(
            TaskKind::Copy,
            TaskFlags::SKIP_CONFLICTS,
            src.path(),
            dst.path(),
            names(&["docs"]),
            Vec::new(),
        )
    };

    let mut first = copy()?;
    run(&mut first, 4);
    assert_eq!(first.progress().conflicts, 0);
    let after_first = snapshot(dst.path())?;

    let mut second = copy()?;
    run(&mut second, 4);
    assert_eq!(second.phase(), Phase::Done);
    assert_eq!(second.progress().conflicts, 4);
    assert_eq!(second.bytes_copied(), 0);
    assert_eq!(snapshot(dst.path())?, after_first);
    Ok(())
}

#[test]
fn test_move_on_same_volume_renames() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let from = dir.path().join("from");
    let to = dir.path().join("to");
    fs::create_dir_all(from.join("pkg/lib"))?;
    fs::create_dir(&to)?;
    fs::write(from.join("pkg/lib/mod.rs"), "pub fn x() {}")?;
    fs::write(from.join("pkg/README"), "readme")?;
    let before = snapshot(&from)?;

    let mut task = Task::new(
        TaskKind::Move,
        TaskFlags::NONE,
        &from,
        &to,
        names(&["pkg"]),
        Vec::new(),
    )?;
    run(&mut task, 2);

    assert_eq!(task.phase(), Phase::Done);
    assert_eq!(task.bytes_copied(), 0);
    assert!(!from.join("pkg").exists());
    assert_eq!(snapshot(&to)?, before);
    let p = task.progress();
    assert_eq!((p.files_done, p.dirs_done, p.size_done), (2, 2, 19));
    Ok(())
}

#[test]
fn test_budget_bounds_each_tick() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    fs::write(src.path().join("big"), vec![7u8; 100])?;

    let mut task = Task::new(
        TaskKind::Copy,
        TaskFlags::NONE,
        src.path(),
        dst.path(),
        names(&["big"]),
        Vec::new(),
    )?
    .with_buffer_size(1);

    task.tick(5);
    assert_eq!(task.phase(), Phase::Executing);
    assert_eq!(task.progress().size_total, 100);

    task.tick(5);
    assert_eq!(task.in_flight_bytes(), 5);
    task.tick(5);
    assert_eq!(task.in_flight_bytes(), 10);
    assert_eq!(task.progress().size_done, 0);
    assert!(task.completion() > 0.09 && task.completion() < 0.11);

    run(&mut task, 50);
    assert_eq!(task.progress().size_done, 100);
    assert_eq!(fs::read(dst.path().join("big"))?, vec![7u8; 100]);
    Ok(())
}

#[test]
fn test_conflicts_counted_then_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    let all: Vec<String> = (0..10).map(|i| format!("f{}", i)).collect();
    for name in &all {
        fs::write(src.path().join(name), "new")?;
    }
    for name in ["f1", "f4", "f7"] {
        fs::write(dst.path().join(name), "old")?;
    }

    let mut task = Task::new(
        TaskKind::Copy,
        TaskFlags::NONE,
        src.path(),
        dst.path(),
        all.iter().map(OsString::from).collect(),
        Vec::new(),
    )?;
    while task.phase() == Phase::Estimating {
        task.tick(3);
    }
    assert_eq!(task.progress().conflicts, 3);
    assert_eq!(task.progress().files_total, 10);

    task.set_conflict_policy(ConflictPolicy::Skip);
    run(&mut task, 3);
    assert_eq!(task.phase(), Phase::Done);
    assert_eq!(task.progress().files_done, 10);
    assert_eq!(fs::read_to_string(dst.path().join("f4"))?, "old");
    assert_eq!(fs::read_to_string(dst.path().join("f5"))?, "new");
    assert_eq!(task.bytes_copied(), 7 * 3);
    Ok(())
}

#[test]
fn test_overwrite_replaces_conflicts() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    fs::create_dir(src.path().join("d"))?;
    fs::write(src.path().join("d/f"), "fresh")?;
    fs::create_dir(dst.path().join("d"))?;
    fs::write(dst.path().join("d/f"), "stale contents")?;

    let mut task = Task::new(
        TaskKind::Copy,
        TaskFlags::OVERWRITE_CONFLICTS,
        src.path(),
        dst.path(),
        names(&["d"]),
        Vec::new(),
    )?;
    run(&mut task, 8);
    assert_eq!(task.phase(), Phase::Done);
    assert_eq!(fs::read_to_string(dst.path().join("d/f"))?, "fresh");
    Ok(())
}

#[test]
fn test_existing_directory_without_policy_fails() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    fs::create_dir(src.path().join("d"))?;
    fs::create_dir(dst.path().join("d"))?;

    let mut task = Task::new(
        TaskKind::Copy,
        TaskFlags::NONE,
        src.path(),
        dst.path(),
        names(&["d"]),
        Vec::new(),
    )?;
    run(&mut task, 8);
    assert_eq!(task.phase(), Phase::Failed);
    assert!(task.last_error().is_some_and(|e| e.is_conflict()));
    Ok(())
}

#[test]
fn test_chmod_without_recursion_touches_only_named() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let top = dir.path().join("top");
    fs::create_dir(&top)?;
    fs::write(top.join("inner"), "x")?;
    fs::set_permissions(&top, fs::Permissions::from_mode(0o700))?;
    fs::set_permissions(top.join("inner"), fs::Permissions::from_mode(0o600))?;

    let spec = ChmodSpec {
        set: 0o050,
        ..ChmodSpec::default()
    };
    let mut task = Task::chmod(dir.path(), names(&["top"]), spec, false)?;
    run(&mut task, 4);

    assert_eq!(task.phase(), Phase::Done);
    assert_eq!(task.progress().dirs_done, 1);
    assert_eq!(task.progress().files_done, 0);
    assert_eq!(fs::metadata(&top)?.permissions().mode() & 0o7777, 0o750);
    assert_eq!(
        fs::metadata(top.join("inner"))?.permissions().mode() & 0o7777,
        0o600
    );
    Ok(())
}

#[test]
fn test_chmod_recursive_reaches_every_entry() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let top = dir.path().join("top");
    fs::create_dir_all(top.join("a/b"))?;
    fs::write(top.join("a/b/c"), "c")?;
    fs::write(top.join("d"), "d")?;

    let spec = ChmodSpec {
        set: 0o010,
        clear: 0o002,
        ..ChmodSpec::default()
    };
    let mut task = Task::chmod(dir.path(), names(&["top"]), spec, true)?;
    run(&mut task, 2);

    assert_eq!(task.phase(), Phase::Done);
    assert_eq!(task.progress().dirs_done, 3);
    assert_eq!(task.progress().files_done, 2);
    for p in [&top, &top.join("a"), &top.join("a/b"), &top.join("a/b/c"), &top.join("d")] {
        let mode = fs::metadata(p)?.permissions().mode();
        assert_eq!(mode & 0o010, 0o010, "{:?}", p);
        assert_eq!(mode & 0o002, 0, "{:?}", p);
    }
    Ok(())
}

#[test]
fn test_failure_mid_tree_keeps_counters_consistent() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    fs::write(src.path().join("a"), "0123456789")?;
    fs::write(src.path().join("b"), "b")?;
    fs::write(src.path().join("c"), "cc")?;
    // A directory where a file has to go cannot be overwritten.
    fs::create_dir_all(dst.path().join("b/sub"))?;

    let mut task = Task::new(
        TaskKind::Copy,
        TaskFlags::OVERWRITE_CONFLICTS,
        src.path(),
        dst.path(),
        names(&["a", "b", "c"]),
        Vec::new(),
    )?;
    run(&mut task, 3);

    assert_eq!(task.phase(), Phase::Failed);
    let err = task.last_error().ok_or("no error recorded")?;
    assert_eq!(err.path(), Some(dst.path().join("b").as_path()));
    let p = task.progress();
    assert_eq!((p.files_total, p.size_total), (3, 13));
    assert_eq!((p.files_done, p.size_done), (1, 10));
    assert_eq!(task.in_flight_bytes(), 0);
    assert!(task.current_path().is_none());
    assert!(!dst.path().join("c").exists());
    Ok(())
}

#[test]
fn test_copy_into_own_subtree_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("a/inner"))?;
    fs::write(dir.path().join("a/f"), "f")?;

    let cases = [
        (TaskKind::Copy, dir.path().join("a"), Vec::new()),
        (TaskKind::Copy, dir.path().join("a/inner"), Vec::new()),
        (TaskKind::Move, dir.path().join("a"), names(&["b"])),
        (TaskKind::Copy, dir.path().join("a/inner/.."), Vec::new()),
        (TaskKind::Copy, dir.path().to_path_buf(), Vec::new()),
    ];
    for (kind, dest, renamed) in cases {
        let result = Task::new(kind, TaskFlags::NONE, dir.path(), &dest, names(&["a"]), renamed);
        assert!(
            matches!(result, Err(TaskError::InvalidRequest(_))),
            "{:?} into {:?} was accepted",
            kind,
            dest
        );
    }
    assert!(!dir.path().join("a/a").exists());

    // A sibling that only shares the name prefix is a valid target.
    fs::create_dir(dir.path().join("ab"))?;
    let mut task = Task::new(
        TaskKind::Copy,
        TaskFlags::NONE,
        dir.path(),
        dir.path().join("ab"),
        names(&["a"]),
        Vec::new(),
    )?;
    run(&mut task, 16);
    assert_eq!(task.phase(), Phase::Done);
    assert_eq!(fs::read_to_string(dir.path().join("ab/a/f"))?, "f");
    Ok(())
}

#[test]
fn test_recursive_chmod_opens_locked_directories() -> Result<(), Box<dyn std::error::Error>> {
    // Mode bits never keep root out of a directory.
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }
    let dir = tempdir()?;
    let locked = dir.path().join("locked");
    fs::create_dir_all(locked.join("sub"))?;
    fs::write(locked.join("sub/f"), "f")?;
    fs::set_permissions(locked.join("sub"), fs::Permissions::from_mode(0o000))?;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;

    let spec = ChmodSpec {
        set: 0o700,
        ..ChmodSpec::default()
    };
    let mut task = Task::chmod(dir.path(), names(&["locked"]), spec, true)?;
    run(&mut task, 4);

    assert_eq!(task.phase(), Phase::Done, "{:?}", task.last_error());
    assert_eq!(task.progress().dirs_done, 2);
    assert_eq!(task.progress().files_done, 1);
    assert_eq!(fs::metadata(&locked)?.permissions().mode() & 0o777, 0o700);
    assert_eq!(fs::metadata(locked.join("sub"))?.permissions().mode() & 0o777, 0o700);
    Ok(())
}

#[test]
fn test_copy_under_new_name() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    fs::create_dir_all(src.path().join("old/deep"))?;
    fs::write(src.path().join("old/deep/file"), "data")?;

    let mut task = Task::new(
        TaskKind::Copy,
        TaskFlags::NONE,
        src.path(),
        dst.path(),
        names(&["old"]),
        names(&["new"]),
    )?;
    run(&mut task, 5);

    assert_eq!(task.phase(), Phase::Done);
    assert_eq!(fs::read_to_string(dst.path().join("new/deep/file"))?, "data");
    assert!(!dst.path().join("old").exists());
    assert!(src.path().join("old/deep/file").exists());
    Ok(())
}

#[test]
fn test_symlinks_are_rewritten_or_kept_raw() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let top = src.path().join("top");
    fs::create_dir(&top)?;
    fs::write(top.join("target"), "t")?;
    fs::write(src.path().join("outside"), "o")?;
    symlink("target", top.join("inner"))?;
    symlink("../outside", top.join("escape"))?;

    let rewritten = tempdir()?;
    let mut task = Task::new(
        TaskKind::Copy,
        TaskFlags::NONE,
        src.path(),
        rewritten.path(),
        names(&["top"]),
        Vec::new(),
    )?;
    run(&mut task, 4);
    assert_eq!(task.phase(), Phase::Done);
    assert_eq!(task.progress().symlinks, 2);
    assert_eq!(
        fs::read_link(rewritten.path().join("top/inner"))?,
        rewritten.path().join("top/target")
    );
    assert_eq!(
        fs::read_link(rewritten.path().join("top/escape"))?,
        src.path().join("outside")
    );

    let raw = tempdir()?;
    let mut task = Task::new(
        TaskKind::Copy,
        TaskFlags::RAW_LINKS,
        src.path(),
        raw.path(),
        names(&["top"]),
        Vec::new(),
    )?;
    run(&mut task, 4);
    assert_eq!(fs::read_link(raw.path().join("top/inner"))?, Path::new("target"));
    assert_eq!(fs::read_link(raw.path().join("top/escape"))?, Path::new("../outside"));
    Ok(())
}

#[test]
fn test_remove_skipping_links_keeps_their_directories() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let top = dir.path().join("top");
    fs::create_dir_all(top.join("keep"))?;
    fs::create_dir_all(top.join("gone"))?;
    fs::write(top.join("gone/file"), "x")?;
    symlink("/etc/hostname", top.join("keep/link"))?;

    let mut task = Task::new(
        TaskKind::Remove,
        TaskFlags::SKIP_LINKS,
        dir.path(),
        dir.path(),
        names(&["top"]),
        Vec::new(),
    )?;
    run(&mut task, 3);

    assert_eq!(task.phase(), Phase::Done);
    assert!(fs::symlink_metadata(top.join("keep/link"))?.file_type().is_symlink());
    assert!(!top.join("gone").exists());
    Ok(())
}

#[test]
fn test_counters_span_all_sources() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    fs::create_dir(src.path().join("a"))?;
    fs::write(src.path().join("a/1"), "11")?;
    fs::write(src.path().join("a/2"), "222")?;
    fs::write(src.path().join("b"), "4444")?;

    let mut task = Task::new(
        TaskKind::Move,
        TaskFlags::NONE,
        src.path(),
        dst.path(),
        names(&["a", "b"]),
        Vec::new(),
    )?;
    while task.phase() == Phase::Estimating {
        task.tick(100);
    }
    let p = *task.progress();
    assert_eq!((p.files_total, p.dirs_total, p.size_total), (3, 1, 9));

    run(&mut task, 100);
    let p = task.progress();
    assert_eq!((p.files_done, p.dirs_done, p.size_done), (3, 1, 9));
    assert_eq!(fs::read_to_string(dst.path().join("b"))?, "4444");
    assert!(!src.path().join("a").exists());
    Ok(())
}

#[test]
fn test_read_only_directory_mode_is_restored() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    let locked = src.path().join("locked");
    fs::create_dir(&locked)?;
    fs::write(locked.join("f"), "f")?;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555))?;

    let mut task = Task::new(
        TaskKind::Copy,
        TaskFlags::NONE,
        src.path(),
        dst.path(),
        names(&["locked"]),
        Vec::new(),
    )?;
    run(&mut task, 2);

    let copied = dst.path().join("locked");
    let mode = fs::metadata(&copied)?.permissions().mode() & 0o777;
    let f_exists = copied.join("f").exists();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
    fs::set_permissions(&copied, fs::Permissions::from_mode(0o755))?;

    assert_eq!(task.phase(), Phase::Done);
    assert!(f_exists);
    assert_eq!(mode, 0o555);
    Ok(())
}
