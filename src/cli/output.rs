//! Text rendering for command output.

use crate::models::{Container, SystemConfig, User, Volume, VolumeFileInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Standard,
    /// Fewer columns, for narrow terminals.
    Compact,
}

/// Left-aligned columns separated by two spaces.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut out = vec![line(headers.to_vec())];
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut size = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    format!("{size:.1} {unit}")
}

pub fn users(users: &[User], mode: DisplayMode) -> String {
    if users.is_empty() {
        return "No users.".to_string();
    }

    match mode {
        DisplayMode::Standard => {
            let rows: Vec<Vec<String>> = users
                .iter()
                .map(|u| {
                    vec![
                        u.id.to_string(),
                        u.username.clone(),
                        u.nickname.clone(),
                        u.created_at.clone().unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();
            table(&["ID", "USERNAME", "NICKNAME", "CREATED"], &rows)
        }
        DisplayMode::Compact => {
            let rows: Vec<Vec<String>> = users
                .iter()
                .map(|u| vec![u.id.to_string(), u.username.clone()])
                .collect();
            table(&["ID", "USERNAME"], &rows)
        }
    }
}

fn health(container: &Container) -> String {
    container
        .health
        .map(|h| h.to_string())
        .unwrap_or_else(|| "none".to_string())
}

pub fn containers(containers: &[Container], mode: DisplayMode) -> String {
    if containers.is_empty() {
        return "No containers.".to_string();
    }

    match mode {
        DisplayMode::Standard => {
            let rows: Vec<Vec<String>> = containers
                .iter()
                .map(|c| {
                    vec![
                        short_id(&c.id).to_string(),
                        c.name.clone(),
                        c.image.clone(),
                        c.state.to_string(),
                        health(c),
                        c.status.clone(),
                    ]
                })
                .collect();
            table(&["ID", "NAME", "IMAGE", "STATE", "HEALTH", "STATUS"], &rows)
        }
        DisplayMode::Compact => {
            let rows: Vec<Vec<String>> = containers
                .iter()
                .map(|c| vec![c.name.clone(), c.state.to_string()])
                .collect();
            table(&["NAME", "STATE"], &rows)
        }
    }
}

pub fn container_details(c: &Container) -> String {
    let mut lines = vec![
        format!("ID:       {}", c.id),
        format!("Name:     {}", c.name),
        format!("Image:    {}", c.image),
        format!("State:    {}", c.state),
        format!("Status:   {}", c.status),
        format!("Health:   {}", health(c)),
    ];

    if let Some(project) = &c.compose_project {
        let service = c.compose_service.as_deref().unwrap_or("-");
        lines.push(format!("Compose:  {project}/{service}"));
    }
    if let Some(policy) = &c.restart_policy {
        lines.push(format!("Restart:  {}", policy.name));
    }
    if !c.ports.is_empty() {
        lines.push("Ports:".to_string());
        for p in &c.ports {
            let host = match (&p.host_ip, &p.host_port) {
                (Some(ip), Some(port)) => format!("{ip}:{port}"),
                (None, Some(port)) => port.clone(),
                _ => "-".to_string(),
            };
            lines.push(format!("  {host} -> {}", p.container_port));
        }
    }
    if !c.mounts.is_empty() {
        lines.push("Mounts:".to_string());
        for m in &c.mounts {
            let access = if m.rw { "rw" } else { "ro" };
            lines.push(format!("  {} -> {} ({}, {access})", m.source, m.destination, m.kind));
        }
    }
    if !c.networks.is_empty() {
        lines.push("Networks:".to_string());
        let mut names: Vec<&String> = c.networks.keys().collect();
        names.sort();
        for name in names {
            let ip = c.networks[name].ip_address.as_deref().unwrap_or("-");
            lines.push(format!("  {name}: {ip}"));
        }
    }

    lines.join("\n")
}

pub fn volumes(volumes: &[Volume], mode: DisplayMode) -> String {
    if volumes.is_empty() {
        return "No volumes.".to_string();
    }

    match mode {
        DisplayMode::Standard => {
            let rows: Vec<Vec<String>> = volumes
                .iter()
                .map(|v| {
                    vec![
                        v.name.clone(),
                        v.driver.clone(),
                        v.containers.len().to_string(),
                        v.created_at.clone(),
                    ]
                })
                .collect();
            table(&["NAME", "DRIVER", "CONTAINERS", "CREATED"], &rows)
        }
        DisplayMode::Compact => {
            let rows: Vec<Vec<String>> = volumes
                .iter()
                .map(|v| {
                    let in_use = if v.containers.is_empty() { "no" } else { "yes" };
                    vec![v.name.clone(), in_use.to_string()]
                })
                .collect();
            table(&["NAME", "IN USE"], &rows)
        }
    }
}

fn entry_name(entry: &VolumeFileInfo) -> String {
    if entry.is_directory {
        format!("{}/", entry.name)
    } else {
        entry.name.clone()
    }
}

pub fn files(entries: &[VolumeFileInfo], mode: DisplayMode) -> String {
    match mode {
        DisplayMode::Standard => {
            let rows: Vec<Vec<String>> = entries
                .iter()
                .map(|e| {
                    let size = if e.is_directory {
                        "-".to_string()
                    } else {
                        format_size(e.size)
                    };
                    vec![e.mode.clone(), size, e.mod_time.clone(), entry_name(e)]
                })
                .collect();
            table(&["MODE", "SIZE", "MODIFIED", "NAME"], &rows)
        }
        DisplayMode::Compact => entries.iter().map(entry_name).collect::<Vec<_>>().join("\n"),
    }
}

pub fn system_config(config: &SystemConfig) -> String {
    [
        format!("docker_socket          {}", config.docker_socket),
        format!("log_level              {}", config.log_level),
        format!("volume_explorer_image  {}", config.volume_explorer_image),
        format!("session_max_timeout    {}h", config.session_max_timeout),
        format!("username               {}", config.username),
        format!("disable_registration   {}", config.disable_registration),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockState;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(65), "65 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(12_582_912), "12.0 MB");
    }

    #[test]
    fn columns_are_aligned() {
        let rows = vec![
            vec!["1".to_string(), "admin".to_string()],
            vec!["10".to_string(), "x".to_string()],
        ];
        let out = table(&["ID", "USERNAME"], &rows);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ID  USERNAME");
        assert_eq!(lines[1], "1   admin");
        assert_eq!(lines[2], "10  x");
    }

    #[test]
    fn compact_mode_drops_columns() {
        let state = MockState::seeded();
        let standard = containers(&state.containers, DisplayMode::Standard);
        let compact = containers(&state.containers, DisplayMode::Compact);

        assert!(standard.contains("IMAGE"));
        assert!(standard.contains("nginx:latest"));
        assert!(!compact.contains("IMAGE"));
        assert!(compact.contains("redis-cache  exited"));
    }

    #[test]
    fn directories_get_a_trailing_slash() {
        let state = MockState::seeded();
        let root = &state.listings[&("mysql-data".to_string(), "/".to_string())];
        let out = files(root, DisplayMode::Compact);
        assert_eq!(out, "mysql/\nibdata1");
    }

    #[test]
    fn empty_lists_say_so() {
        assert_eq!(users(&[], DisplayMode::Standard), "No users.");
        assert_eq!(volumes(&[], DisplayMode::Compact), "No volumes.");
    }
}
