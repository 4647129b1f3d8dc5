use engine_core::{EntityId, SystemRegistry, Transform, World};
use engine_renderer::glam::{Mat4, Vec3};
use engine_renderer::{
    DrawCommand, DrawGroupId, FrameTasks, HeadlessBackend, LayoutState, Mesh, MeshAggregator,
    MeshBinding, PerInstanceRecord, TextureBinding, TransformSystem,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct App {
    world: World,
    systems: SystemRegistry,
    backend: HeadlessBackend,
    group: DrawGroupId,
}

impl App {
    fn new() -> Self {
        let mut world = World::new();
        world.register_component::<Transform>();
        world.register_component::<MeshBinding>();
        let mut aggregator = MeshAggregator::default();
        let group = aggregator.create_draw_group("scene");
        world.insert_resource(aggregator);
        world.insert_resource(FrameTasks::new());

        let mut systems = SystemRegistry::new();
        systems.register(TransformSystem::new());

        Self {
            world,
            systems,
            backend: HeadlessBackend::new(),
            group,
        }
    }

    /// `count`個のエンティティで1つのメッシュを共有する
    fn spawn_mesh(&mut self, mesh: Mesh, label: &str, count: usize) -> Vec<EntityId> {
        let first = self.world.spawn();
        self.world.insert(first, Transform::identity()).unwrap();
        let master = MeshBinding::create_master(
            &mut self.world,
            first,
            self.group,
            mesh,
            label,
            TextureBinding::default(),
        )
        .unwrap();

        let mut entities = vec![first];
        for i in 1..count {
            let entity = self.world.spawn();
            self.world
                .insert(entity, Transform::from_position(Vec3::new(i as f32, 0.0, 0.0)))
                .unwrap();
            master
                .instantiate(&mut self.world, entity, TextureBinding::new(i as u32, 0))
                .unwrap();
            entities.push(entity);
        }
        entities
    }

    fn rebuild(&mut self) {
        let mut tasks = self.world.remove_resource::<FrameTasks>().unwrap();
        let aggregator = self.world.resource_mut::<MeshAggregator>().unwrap();
        aggregator.build(self.group).unwrap();
        aggregator
            .upload(self.group, &mut self.backend, &mut tasks)
            .unwrap();
        self.world.insert_resource(tasks);
    }

    /// システム更新のあと転送タスクを実行する
    fn frame(&mut self) -> usize {
        self.systems.update_all(&mut self.world).unwrap();
        self.world
            .resource_mut::<FrameTasks>()
            .unwrap()
            .execute(&mut self.backend)
    }

    fn instance_buffer(&self) -> Vec<PerInstanceRecord> {
        let aggregator = self.world.resource::<MeshAggregator>().unwrap();
        let buffers = aggregator.draw_group(self.group).unwrap().buffers().unwrap();
        self.backend.read(buffers.instance).unwrap()
    }
}

#[test]
fn test_frame_flow_end_to_end() {
    let mut app = App::new();
    let small = app.spawn_mesh(Mesh::cube_shared(), "small", 25);
    let large = app.spawn_mesh(Mesh::cube(), "large", 125);
    app.rebuild();

    // 最初のフレーム: アップロード + メッシュ2つ分の初期Transformの同期
    assert_eq!(app.frame(), 3);

    let aggregator = app.world.resource::<MeshAggregator>().unwrap();
    let group = aggregator.draw_group(app.group).unwrap();
    assert_eq!(group.state(), LayoutState::Uploaded);
    let buffers = group.buffers().unwrap();
    let commands = app.backend.read::<DrawCommand>(buffers.commands).unwrap();
    assert_eq!(
        commands[0],
        DrawCommand { index_count: 36, instance_count: 25, first_index: 0, vertex_offset: 0, first_instance: 0 }
    );
    assert_eq!(
        commands[1],
        DrawCommand { index_count: 36, instance_count: 125, first_index: 36, vertex_offset: 8, first_instance: 25 }
    );

    let records = app.instance_buffer();
    assert_eq!(records[26].model_matrix(), Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
    assert_eq!(records[26].textures(), TextureBinding::new(1, 0));

    // 何も変わらなければ何も書かない
    app.backend.clear_ops();
    assert_eq!(app.frame(), 0);
    assert!(app.backend.ops().is_empty());

    // 大きいメッシュのインスタンスだけを全部動かすと、書き込みは1回
    for &entity in &large {
        app.world
            .get_mut::<Transform>(entity)
            .unwrap()
            .translate(Vec3::new(0.0, 1.0, 0.0));
    }
    assert_eq!(app.frame(), 1);
    assert_eq!(app.backend.write_count(buffers.instance), 1);

    let records = app.instance_buffer();
    assert_eq!(records[25].model_matrix(), Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)));
    assert_eq!(records[0].model_matrix(), Mat4::IDENTITY);
    assert_eq!(small.len(), 25);
}

#[test]
fn test_random_frames_match_host_state() {
    let mut app = App::new();
    let mut entities = app.spawn_mesh(Mesh::cube_shared(), "a", 10);
    entities.extend(app.spawn_mesh(Mesh::cube(), "b", 30));
    entities.extend(app.spawn_mesh(Mesh::cube_shared(), "c", 5));
    app.rebuild();
    app.frame();

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        for _ in 0..rng.gen_range(1..40) {
            let entity = entities[rng.gen_range(0..entities.len())];
            let position = Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), 0.0);
            app.world.get_mut::<Transform>(entity).unwrap().set_position(position);
        }
        let writes = app.frame();
        assert!(writes <= 3);
    }

    // GPU側のインスタンスバッファはメモリ上のレコードと一致する
    let records = app.instance_buffer();
    let aggregator = app.world.resource::<MeshAggregator>().unwrap();
    for &entity in &entities {
        let binding = *app.world.get::<MeshBinding>(entity).unwrap();
        let mesh = aggregator.mesh(binding.mesh()).unwrap();
        let slot = mesh.instance_slots()[binding.instance() as usize] as usize;
        let expected = app.world.get::<Transform>(entity).unwrap().to_matrix();
        assert_eq!(records[slot].model_matrix(), expected);
        assert_eq!(mesh.instance_data()[binding.instance() as usize].model_matrix(), expected);
    }
}

#[test]
fn test_late_instance_triggers_rebuild() {
    let mut app = App::new();
    let entities = app.spawn_mesh(Mesh::cube(), "cube", 3);
    app.rebuild();
    app.frame();

    let master = *app.world.get::<MeshBinding>(entities[0]).unwrap();
    let late = app.world.spawn();
    app.world
        .insert(late, Transform::from_position(Vec3::new(9.0, 0.0, 0.0)))
        .unwrap();
    master
        .instantiate(&mut app.world, late, TextureBinding::default())
        .unwrap();

    // レイアウトが古いので同期は書き込まない
    assert_eq!(app.frame(), 0);
    let aggregator = app.world.resource::<MeshAggregator>().unwrap();
    assert_eq!(aggregator.draw_group(app.group).unwrap().state(), LayoutState::Stale);

    app.rebuild();
    app.frame();
    let records = app.instance_buffer();
    assert_eq!(records[3].model_matrix(), Mat4::from_translation(Vec3::new(9.0, 0.0, 0.0)));
    assert_eq!(app.backend.live_buffers(), 4);
}
