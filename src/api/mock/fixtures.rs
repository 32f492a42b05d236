//! Seed data for the mock backend.

use std::collections::HashMap;

use crate::models::{
    Container, ContainerHealth, ContainerState, MountInfo, NetworkInfo, PortBinding,
    RestartPolicy, SystemConfig, User, Volume, VolumeFileContent, VolumeFileInfo,
};

/// A user together with the password the mock checks at login.
#[derive(Debug, Clone)]
pub struct MockUser {
    pub user: User,
    pub password: String,
}

/// Everything the mock backend knows. Build one per backend; nothing is
/// shared between instances.
#[derive(Debug, Clone)]
pub struct MockState {
    pub users: Vec<MockUser>,
    pub containers: Vec<Container>,
    pub volumes: Vec<Volume>,
    /// Directory listings keyed by `(volume, directory path)`.
    pub listings: HashMap<(String, String), Vec<VolumeFileInfo>>,
    /// File contents keyed by `(volume, file path)`.
    pub files: HashMap<(String, String), VolumeFileContent>,
    pub config: SystemConfig,
}

impl Default for MockState {
    fn default() -> Self {
        Self::seeded()
    }
}

fn user(id: i64, username: &str, nickname: &str, password: &str, day: u32) -> MockUser {
    let stamp = format!("2024-01-{day:02}T00:00:00Z");
    MockUser {
        user: User {
            id,
            username: username.to_string(),
            nickname: nickname.to_string(),
            created_at: Some(stamp.clone()),
            updated_at: Some(stamp),
        },
        password: password.to_string(),
    }
}

fn container(
    id: &str,
    name: &str,
    image: &str,
    state: ContainerState,
    status: &str,
    health: ContainerHealth,
    created: i64,
) -> Container {
    Container {
        id: id.to_string(),
        name: name.to_string(),
        image: image.to_string(),
        state,
        status: status.to_string(),
        health: Some(health),
        created,
        is_self: false,
        compose_project: None,
        compose_service: None,
        labels: HashMap::new(),
        restart_policy: None,
        env: Vec::new(),
        networks: HashMap::new(),
        ports: Vec::new(),
        mounts: Vec::new(),
        hostname: None,
    }
}

fn compose(mut c: Container, project: &str, service: &str, ip: &str) -> Container {
    c.compose_project = Some(project.to_string());
    c.compose_service = Some(service.to_string());
    c.labels.insert(
        "com.docker.compose.project".to_string(),
        project.to_string(),
    );
    c.labels.insert(
        "com.docker.compose.service".to_string(),
        service.to_string(),
    );
    c.restart_policy = Some(RestartPolicy {
        name: "unless-stopped".to_string(),
        maximum_retry_count: 0,
    });
    c.networks.insert(
        format!("{project}_default"),
        NetworkInfo {
            network_id: format!("net-{project}"),
            gateway: Some("172.18.0.1".to_string()),
            ip_address: Some(ip.to_string()),
            mac_address: None,
        },
    );
    c.hostname = Some(c.id.clone());
    c
}

fn mount(volume: &str, destination: &str) -> MountInfo {
    MountInfo {
        kind: "volume".to_string(),
        source: volume.to_string(),
        destination: destination.to_string(),
        mode: Some("z".to_string()),
        rw: true,
    }
}

fn port(container_port: &str, host_port: &str) -> PortBinding {
    PortBinding {
        container_port: container_port.to_string(),
        host_ip: Some("0.0.0.0".to_string()),
        host_port: Some(host_port.to_string()),
    }
}

fn volume(name: &str, created_at: &str, containers: &[&str]) -> Volume {
    Volume {
        name: name.to_string(),
        driver: "local".to_string(),
        mountpoint: format!("/var/lib/docker/volumes/{name}/_data"),
        created_at: created_at.to_string(),
        scope: "local".to_string(),
        containers: containers.iter().map(|c| c.to_string()).collect(),
    }
}

fn dir(parent: &str, name: &str) -> VolumeFileInfo {
    VolumeFileInfo {
        name: name.to_string(),
        path: join(parent, name),
        is_directory: true,
        size: 4096,
        mode: "drwxr-xr-x".to_string(),
        mod_time: "2024-01-15T10:30:00Z".to_string(),
    }
}

fn file(parent: &str, name: &str, size: i64) -> VolumeFileInfo {
    VolumeFileInfo {
        name: name.to_string(),
        path: join(parent, name),
        is_directory: false,
        size,
        mode: "-rw-r--r--".to_string(),
        mod_time: "2024-01-15T10:30:00Z".to_string(),
    }
}

pub(crate) fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

impl MockState {
    /// An empty backend with the default system config.
    pub fn empty() -> Self {
        Self {
            users: Vec::new(),
            containers: Vec::new(),
            volumes: Vec::new(),
            listings: HashMap::new(),
            files: HashMap::new(),
            config: SystemConfig {
                docker_socket: "/var/run/docker.sock".to_string(),
                log_level: "info".to_string(),
                volume_explorer_image: "ghcr.io/dev-zapi/docker-simple-panel:latest".to_string(),
                session_max_timeout: 24,
                username: "admin".to_string(),
                disable_registration: false,
            },
        }
    }

    /// The development fixture.
    pub fn seeded() -> Self {
        let mut state = Self::empty();

        state.users = vec![
            user(1, "admin", "Administrator", "admin123", 1),
            user(2, "user1", "User One", "pass123", 2),
            user(3, "user2", "User Two", "pass123", 3),
        ];

        let mut nginx = compose(
            container(
                "container1",
                "nginx-web",
                "nginx:latest",
                ContainerState::Running,
                "Up 2 hours",
                ContainerHealth::Healthy,
                1705315800,
            ),
            "web",
            "nginx",
            "172.18.0.2",
        );
        nginx.ports = vec![port("80/tcp", "8081"), port("443/tcp", "8443")];
        nginx.mounts = vec![mount("nginx-config", "/etc/nginx")];

        let mut mysql = compose(
            container(
                "container2",
                "mysql-db",
                "mysql:8.0",
                ContainerState::Running,
                "Up 2 hours",
                ContainerHealth::Healthy,
                1705315500,
            ),
            "web",
            "db",
            "172.18.0.3",
        );
        mysql.env = vec![
            "MYSQL_DATABASE=app".to_string(),
            "MYSQL_ROOT_PASSWORD=secret".to_string(),
        ];
        mysql.mounts = vec![mount("mysql-data", "/var/lib/mysql")];

        let mut redis = container(
            "container3",
            "redis-cache",
            "redis:7",
            ContainerState::Exited,
            "Exited (0) 10 minutes ago",
            ContainerHealth::None,
            1705315200,
        );
        redis.mounts = vec![mount("redis-data", "/data")];

        let postgres = container(
            "container4",
            "postgres-db",
            "postgres:15",
            ContainerState::Running,
            "Up 2 hours (health: starting)",
            ContainerHealth::Starting,
            1705314900,
        );

        state.containers = vec![nginx, mysql, redis, postgres];

        state.volumes = vec![
            volume("mysql-data", "2024-01-15T10:25:00Z", &["container2"]),
            volume("nginx-config", "2024-01-15T10:30:00Z", &["container1"]),
            volume("redis-data", "2024-01-15T10:20:00Z", &["container3"]),
            volume("old-backups", "2023-11-02T08:00:00Z", &[]),
        ];

        let listing = |volume: &str, path: &str, entries: Vec<VolumeFileInfo>| {
            ((volume.to_string(), path.to_string()), entries)
        };
        state.listings = HashMap::from([
            listing(
                "mysql-data",
                "/",
                vec![dir("/", "mysql"), file("/", "ibdata1", 12_582_912)],
            ),
            listing(
                "mysql-data",
                "/mysql",
                vec![file("/mysql", "db.opt", 65), file("/mysql", "user.ibd", 131_072)],
            ),
            listing(
                "nginx-config",
                "/",
                vec![dir("/", "conf.d"), file("/", "nginx.conf", 143)],
            ),
            listing(
                "nginx-config",
                "/conf.d",
                vec![file("/conf.d", "default.conf", 118)],
            ),
            listing("redis-data", "/", vec![file("/", "dump.rdb", 2048)]),
            listing("old-backups", "/", vec![file("/", "backup-2023-11.tar.gz", 52_428_800)]),
        ]);

        let content = |volume: &str, path: &str, text: &str| {
            (
                (volume.to_string(), path.to_string()),
                VolumeFileContent {
                    path: path.to_string(),
                    content: text.to_string(),
                    size: text.len() as i64,
                },
            )
        };
        state.files = HashMap::from([
            content(
                "mysql-data",
                "/mysql/db.opt",
                "default-character-set=utf8mb4\ndefault-collation=utf8mb4_0900_ai_ci\n",
            ),
            content(
                "nginx-config",
                "/nginx.conf",
                "worker_processes auto;\n\nevents {\n    worker_connections 1024;\n}\n\nhttp {\n    include /etc/nginx/conf.d/*.conf;\n}\n",
            ),
            content(
                "nginx-config",
                "/conf.d/default.conf",
                "server {\n    listen 80;\n    location / {\n        root /usr/share/nginx/html;\n    }\n}\n",
            ),
        ]);

        state
    }
}
