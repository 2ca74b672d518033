use boxstore_core::db::{open_db, open_db_in_memory};
use boxstore_core::{
    provision_box_atomically, provision_item_atomically, AllocationPolicy, BoxAndItemService,
    BoxId, BoxRepository, BoxServiceError, ItemId, RepoError, SqliteBoxRepository, UnitOfWork,
    DEFAULT_BOX_TITLE, DEFAULT_ITEM_TITLE,
};

#[test]
fn provision_box_persists_default_box() {
    let conn = open_db_in_memory().unwrap();
    let service = BoxAndItemService::new(SqliteBoxRepository::try_new(&conn).unwrap());

    let box_id = service.provision_box().unwrap();

    let loaded = service.box_with_id(box_id).unwrap().unwrap();
    assert_eq!(loaded.title, DEFAULT_BOX_TITLE);
    assert!(loaded.items.is_empty());
    assert_eq!(service.count().unwrap(), 1);
}

#[test]
fn provision_item_adds_default_item_to_box() {
    let conn = open_db_in_memory().unwrap();
    let service = BoxAndItemService::new(SqliteBoxRepository::try_new(&conn).unwrap());

    let box_id = service.provision_box().unwrap();
    let first = service.provision_item(box_id).unwrap();
    let second = service.provision_item(box_id).unwrap();
    assert_ne!(first, second);

    let loaded = service.box_with_id(box_id).unwrap().unwrap();
    let ids: Vec<ItemId> = loaded.items.iter().map(|item| item.id).collect();
    assert_eq!(ids, [first, second]);
    assert!(loaded
        .items
        .iter()
        .all(|item| item.title == DEFAULT_ITEM_TITLE));
}

#[test]
fn provision_item_in_missing_box_fails_without_side_effects() {
    let conn = open_db_in_memory().unwrap();
    let service = BoxAndItemService::new(SqliteBoxRepository::try_new(&conn).unwrap());
    let missing = BoxId::new(404).unwrap();

    let err = service.provision_item(missing).unwrap_err();
    assert!(matches!(err, BoxServiceError::BoxNotFound(id) if id == missing));

    let items: i64 = conn
        .query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(items, 0);
}

#[test]
fn change_titles_trims_and_rejects_blank() {
    let conn = open_db_in_memory().unwrap();
    let service = BoxAndItemService::new(SqliteBoxRepository::try_new(&conn).unwrap());
    let box_id = service.provision_box().unwrap();
    let item_id = service.provision_item(box_id).unwrap();

    service.change_box_title(box_id, "  Kitchen ").unwrap();
    service.change_item_title(item_id, "Spoons", box_id).unwrap();
    assert!(matches!(
        service.change_box_title(box_id, "   "),
        Err(BoxServiceError::InvalidTitle)
    ));

    let loaded = service.box_with_id(box_id).unwrap().unwrap();
    assert_eq!(loaded.title, "Kitchen");
    assert_eq!(loaded.items[0].title, "Spoons");
}

#[test]
fn item_operations_require_matching_box() {
    let conn = open_db_in_memory().unwrap();
    let service = BoxAndItemService::new(SqliteBoxRepository::try_new(&conn).unwrap());
    let owner = service.provision_box().unwrap();
    let stranger = service.provision_box().unwrap();
    let item_id = service.provision_item(owner).unwrap();

    assert!(matches!(
        service.change_item_title(item_id, "moved?", stranger),
        Err(BoxServiceError::ItemNotFound { .. })
    ));
    assert!(matches!(
        service.remove_item(item_id, stranger),
        Err(BoxServiceError::ItemNotFound { .. })
    ));

    service.remove_box(stranger).unwrap();
    assert!(matches!(
        service.remove_item(item_id, stranger),
        Err(BoxServiceError::ItemNotFound { .. })
    ));

    service.remove_item(item_id, owner).unwrap();
    assert!(service.box_with_id(owner).unwrap().unwrap().items.is_empty());
}

#[test]
fn remove_box_drops_its_items() {
    let conn = open_db_in_memory().unwrap();
    let service = BoxAndItemService::new(SqliteBoxRepository::try_new(&conn).unwrap());
    let box_id = service.provision_box().unwrap();
    let item_id = service.provision_item(box_id).unwrap();

    service.remove_box(box_id).unwrap();

    assert!(service.box_with_id(box_id).unwrap().is_none());
    assert!(service
        .repository()
        .item_with_id(item_id)
        .unwrap()
        .is_none());
    assert!(matches!(
        service.remove_box(box_id),
        Err(BoxServiceError::BoxNotFound(_))
    ));
}

#[test]
fn unit_of_work_commit_persists_and_rollback_discards() {
    let mut conn = open_db_in_memory().unwrap();

    let committed = {
        let uow = UnitOfWork::begin(&mut conn).unwrap();
        let box_id = BoxAndItemService::new(uow.repository().unwrap())
            .provision_box()
            .unwrap();
        uow.commit().unwrap();
        box_id
    };

    let discarded = {
        let uow = UnitOfWork::begin(&mut conn).unwrap();
        let box_id = BoxAndItemService::new(uow.repository().unwrap())
            .provision_box()
            .unwrap();
        uow.rollback().unwrap();
        box_id
    };

    let dropped = {
        let uow = UnitOfWork::begin(&mut conn).unwrap();
        let box_id = BoxAndItemService::new(uow.repository().unwrap())
            .provision_box()
            .unwrap();
        drop(uow);
        box_id
    };

    let repo = SqliteBoxRepository::try_new(&conn).unwrap();
    assert!(repo.box_with_id(committed).unwrap().is_some());
    assert!(repo.box_with_id(discarded).unwrap().is_none());
    assert!(repo.box_with_id(dropped).unwrap().is_none());
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn atomic_provisioning_commits_box_and_item() {
    let mut conn = open_db_in_memory().unwrap();

    let box_id = provision_box_atomically(&mut conn, AllocationPolicy::default()).unwrap();
    let item_id =
        provision_item_atomically(&mut conn, box_id, AllocationPolicy::bounded(8)).unwrap();

    let repo = SqliteBoxRepository::try_new(&conn).unwrap();
    let (owner, item) = repo.item_with_id(item_id).unwrap().unwrap();
    assert_eq!(owner, box_id);
    assert_eq!(item.title, DEFAULT_ITEM_TITLE);
}

#[test]
fn atomic_item_provisioning_rolls_back_on_missing_box() {
    let mut conn = open_db_in_memory().unwrap();
    let missing = BoxId::new(12).unwrap();

    let err = provision_item_atomically(&mut conn, missing, AllocationPolicy::default())
        .unwrap_err();
    assert!(matches!(err, BoxServiceError::BoxNotFound(_)));
    assert!(conn.is_autocommit());
}

#[test]
fn open_unit_of_work_blocks_a_second_writer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.sqlite3");
    let mut writer = open_db(&path).unwrap();
    let mut other = open_db(&path).unwrap();
    other.busy_timeout(std::time::Duration::ZERO).unwrap();

    let uow = UnitOfWork::begin(&mut writer).unwrap();
    let err = provision_box_atomically(&mut other, AllocationPolicy::default()).unwrap_err();
    assert!(matches!(err, BoxServiceError::Repo(RepoError::Db(_))));
    uow.rollback().unwrap();

    provision_box_atomically(&mut other, AllocationPolicy::default()).unwrap();
}
