/// Selection policy over engine ray hits.
///
/// The nearest hit owned by an entity of `container` decides: a door part of an entity
/// with a door role wins, otherwise a removable entity, otherwise nothing. Hits on nodes of
/// other containers and on ownerless nodes are skipped.
fn resolve_interaction_target(
    hits: &[RayHit],
    container: &EntityContainer,
    interaction_distance: f32,
) -> Option<InteractionTarget> {
    let (hit, part, entity) = hits.iter().find_map(|hit| {
        let owner = hit.owner?;
        let entity = container.find(owner.entity)?;
        Some((hit, owner.part, entity))
    })?;
    if hit.distance > interaction_distance {
        return None;
    }

    if part == NodePart::Door {
        if let Some(role) = entity.door {
            return Some(InteractionTarget {
                entity: entity.id,
                distance: hit.distance,
                door: Some(role),
            });
        }
    }

    entity.removable.then_some(InteractionTarget {
        entity: entity.id,
        distance: hit.distance,
        door: None,
    })
}

/// Where a build lands: straight ahead at the configured distance, or where the view ray
/// meets the floor when looking down (always tried indoors), kept inside the reach band
/// and the container bounds. `clearance` is the least distance for the kind being built and
/// wins over the band's upper end.
fn compute_placement_point(
    camera: &FirstPersonCamera,
    floor_y: f32,
    inside: bool,
    limit: f32,
    clearance: f32,
    config: &GameplayConfig,
) -> Vec3 {
    let (min_distance, max_distance) = (
        config.placement_min_distance,
        config.placement_max_distance,
    );
    let mut distance = config.placement_distance.clamp(min_distance, max_distance);

    let forward = camera.forward();
    if inside || forward.y < -DOWNWARD_LOOK_EPSILON {
        if let Some(hit) = floor_intersection(camera.position, forward, floor_y) {
            let reach = Vec3::new(hit.x - camera.position.x, 0.0, hit.z - camera.position.z);
            distance = reach.length().clamp(min_distance, max_distance);
        }
    }

    let distance = distance.max(clearance);

    let base = Vec3::new(camera.position.x, floor_y, camera.position.z);
    clamp_to_square(base + camera.flat_forward() * distance, limit)
}

fn floor_intersection(origin: Vec3, direction: Vec3, floor_y: f32) -> Option<Vec3> {
    if direction.y >= -DOWNWARD_LOOK_EPSILON {
        return None;
    }
    let t = (floor_y - origin.y) / direction.y;
    (t.is_finite() && t > 0.0).then(|| origin + direction * t)
}

fn day_phase(elapsed_seconds: f32, day_seconds: f32, night_seconds: f32) -> DayPhase {
    let cycle = day_seconds + night_seconds;
    if !cycle.is_finite() || cycle <= 0.0 || !elapsed_seconds.is_finite() {
        return DayPhase {
            is_day: true,
            progress: 0.0,
        };
    }

    let remainder = elapsed_seconds.rem_euclid(cycle);
    if remainder < day_seconds {
        DayPhase {
            is_day: true,
            progress: remainder / day_seconds,
        }
    } else {
        DayPhase {
            is_day: false,
            progress: (remainder - day_seconds) / night_seconds,
        }
    }
}

fn lighting_for_phase(phase: DayPhase) -> LightingState {
    let arc = phase.progress * PI;
    let orbit = Vec3::new(arc.cos(), arc.sin(), -0.3) * SUN_ORBIT_RADIUS;
    let swell = arc.sin();

    if phase.is_day {
        let sun_intensity = 0.5 + 0.5 * swell;
        let sky = if phase.progress < TWILIGHT_EDGE || phase.progress > 1.0 - TWILIGHT_EDGE {
            Rgb::from_hex(TWILIGHT_SKY_COLOR)
        } else {
            Rgb::from_hex(DAY_SKY_COLOR)
        };
        LightingState {
            sun_position: orbit,
            sun_intensity,
            sun_visible: true,
            moon_position: -orbit,
            moon_intensity: 0.0,
            moon_visible: false,
            ambient_intensity: 0.2 + 0.4 * sun_intensity,
            sky_color: sky,
            fog_color: sky,
        }
    } else {
        let moon_intensity = 0.1 + 0.2 * swell;
        let sky = Rgb::from_hex(NIGHT_SKY_COLOR);
        LightingState {
            sun_position: -orbit,
            sun_intensity: 0.0,
            sun_visible: false,
            moon_position: orbit,
            moon_intensity,
            moon_visible: true,
            ambient_intensity: 0.05 + 0.5 * moon_intensity,
            sky_color: sky,
            fog_color: sky,
        }
    }
}

fn indoor_lighting() -> LightingState {
    let tint = Rgb::from_hex(INDOOR_TINT_COLOR);
    LightingState {
        sun_intensity: 0.0,
        sun_visible: false,
        moon_intensity: 0.0,
        moon_visible: false,
        ambient_intensity: INDOOR_AMBIENT,
        sky_color: tint,
        fog_color: tint,
        ..LightingState::default()
    }
}

fn update_animals(
    container: &mut EntityContainer,
    mode: &WanderMode,
    clock_seconds: f32,
    fixed_dt_seconds: f32,
    rng: &mut StdRng,
    graph: &mut SceneGraph,
) {
    for entity in container.entities_mut() {
        if !entity.is_animal() {
            continue;
        }
        step_animal(entity, mode, clock_seconds, fixed_dt_seconds, rng);
        EntityFactory::sync(entity, graph);
    }
}

fn step_animal(
    entity: &mut Entity,
    mode: &WanderMode,
    clock_seconds: f32,
    fixed_dt_seconds: f32,
    rng: &mut impl Rng,
) {
    let profile = gait_profile(entity.kind);
    let Some(animal) = entity.animal.as_mut() else {
        return;
    };
    let mut position = entity.position;
    let mut orientation = entity.orientation;

    if clock_seconds >= animal.next_move_at {
        let center = mode.center.unwrap_or(animal.initial_position);
        let radius = mode
            .radius_cap
            .map_or(animal.params.wander_radius, |cap| {
                animal.params.wander_radius.min(cap)
            });
        let angle = draw(rng, 0.0, TAU);
        let reach = radius * draw(rng, WANDER_MIN_RADIUS_FRACTION, 1.0);
        let target = center + Vec3::new(angle.cos() * reach, 0.0, angle.sin() * reach);
        animal.target_position = clamp_to_square(target, mode.limit);
        animal.next_move_at = clock_seconds + draw(rng, mode.wait_min, mode.wait_max);
    }

    let to_target = Vec3::new(
        animal.target_position.x - position.x,
        0.0,
        animal.target_position.z - position.z,
    );
    let remaining = to_target.length();
    if remaining > mode.arrive_threshold {
        let direction = to_target / remaining;
        let sideways = Vec3::new(-direction.z, 0.0, direction.x);
        let speed = animal.params.move_speed;
        animal.drift_phase = (animal.drift_phase + fixed_dt_seconds * DRIFT_FREQUENCY) % TAU;
        let drift = sideways * animal.drift_phase.sin() * DRIFT_AMPLITUDE;
        position += (direction + drift) * speed * fixed_dt_seconds;

        let turn = (TURN_GAIN_PER_SECOND * fixed_dt_seconds).min(1.0);
        let heading_error = wrap_angle(heading_yaw(direction) - orientation.yaw);
        orientation.yaw = wrap_angle(orientation.yaw + heading_error * turn);

        animal.moving = true;
        animal.gait_phase =
            (animal.gait_phase + fixed_dt_seconds * speed * profile.stride_rate) % TAU;
        animal.tail_phase = (animal.tail_phase + fixed_dt_seconds * profile.tail_rate) % TAU;
        animal.bob_offset = animal.gait_phase.sin().abs() * profile.bob_height * speed;
        orientation.pitch = animal.gait_phase.sin() * 0.03;
        orientation.roll = animal.gait_phase.cos() * 0.02;
    } else {
        animal.moving = false;
        animal.bob_offset = (clock_seconds * IDLE_BOB_RATE).sin().abs() * IDLE_BOB_HEIGHT;
        orientation.pitch = 0.0;
        orientation.roll = 0.0;
        if rng.gen_bool(LOOK_AROUND_CHANCE_PER_TICK) {
            let nudge = draw(rng, -LOOK_AROUND_MAX_RADIANS, LOOK_AROUND_MAX_RADIANS);
            orientation.yaw = wrap_angle(orientation.yaw + nudge);
        }
    }

    if let Some(soft_limit) = mode.soft_limit {
        let mut redirected = false;
        for axis in [0, 2] {
            if position[axis].abs() > soft_limit {
                let side = position[axis].signum();
                position[axis] = position[axis].clamp(-mode.limit, mode.limit);
                let offset = draw(rng, SOFT_REDIRECT_MIN, SOFT_REDIRECT_MAX);
                animal.target_position[axis] = position[axis] - side * offset;
                redirected = true;
            }
        }
        if redirected {
            animal.target_position = clamp_to_square(animal.target_position, soft_limit);
        }
    }

    position = clamp_to_square(position, mode.limit);
    position.y = mode.floor_y + animal.bob_offset;
    entity.position = position;
    entity.orientation = orientation;
}

fn gait_profile(kind: EntityKind) -> GaitProfile {
    let (stride_rate, tail_rate, bob_height) = match kind {
        EntityKind::Cow => (4.0, 2.0, 0.02),
        EntityKind::Pig => (6.0, 3.0, 0.02),
        EntityKind::Horse => (3.5, 2.0, 0.03),
        EntityKind::Cat => (8.0, 5.0, 0.01),
        EntityKind::Dog => (7.0, 10.0, 0.015),
        _ => (5.0, 3.0, 0.02),
    };
    GaitProfile {
        stride_rate,
        tail_rate,
        bob_height,
    }
}

/// WASD walk on the floor plane at `speed`, then clamp into the active bounds.
fn apply_locomotion(
    camera: &mut FirstPersonCamera,
    input: &InputSnapshot,
    fixed_dt_seconds: f32,
    speed: f32,
    limit: f32,
) {
    let axis = |positive: InputAction, negative: InputAction| {
        f32::from(u8::from(input.is_down(positive))) - f32::from(u8::from(input.is_down(negative)))
    };
    let forward = axis(InputAction::MoveForward, InputAction::MoveBack);
    let strafe = axis(InputAction::StrafeRight, InputAction::StrafeLeft);

    let len = (forward * forward + strafe * strafe).sqrt();
    if len > 0.0 {
        let step = speed * fixed_dt_seconds / len;
        camera.walk(forward * step, strafe * step);
    }
    camera.position = clamp_to_square(camera.position, limit);
}
