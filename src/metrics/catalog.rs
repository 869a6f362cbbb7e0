//! The fixed table of telemetry commands.
//!
//! Each [`Metric`] pairs an argument vector with a parser for its standard
//! output. Parsers replace the pipelines (`| awk`, `| grep`, `| head`) one
//! would otherwise hand to a shell.

/// Extracts a metric value from a command's standard output.
pub type Extractor = fn(&str) -> Option<String>;

/// One named value produced by running a fixed command.
#[derive(Debug, Clone, Copy)]
pub struct Metric {
    pub name: &'static str,
    pub argv: &'static [&'static str],
    pub extract: Extractor,
}

impl Metric {
    const fn new(name: &'static str, argv: &'static [&'static str], extract: Extractor) -> Self {
        Self {
            name,
            argv,
            extract,
        }
    }

    /// The same command and parser under a different key.
    pub const fn renamed(self, name: &'static str) -> Self {
        Self { name, ..self }
    }
}

/// A group of metrics served under `/<name>/<metric>`.
#[derive(Debug)]
pub struct Domain {
    pub name: &'static str,
    pub metrics: &'static [Metric],
    /// Route names that return every metric of the domain at once.
    pub aggregates: &'static [&'static str],
}

impl Domain {
    pub fn metric(&self, name: &str) -> Option<&'static Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn is_aggregate(&self, name: &str) -> bool {
        self.aggregates.contains(&name)
    }
}

const DF: &[&str] = &["df", "-h", "/"];
const TOP: &[&str] = &["top", "-bn1"];
const FREE: &[&str] = &["free", "-h"];
const GPIO_READALL: &[&str] = &["gpio", "readall"];

pub const DISK_TOTAL: Metric = Metric::new("total", DF, df_total);
pub const DISK_USED: Metric = Metric::new("used", DF, df_used);
pub const DISK_FREE: Metric = Metric::new("free", DF, df_free);

pub const OS: Metric = Metric::new("os", &["lsb_release", "-ds"], os_description);
pub const UPTIME: Metric = Metric::new("uptime", &["uptime", "-p"], whole);
pub const KERNEL: Metric = Metric::new("kernel", &["uname", "-r"], whole);
pub const MODEL: Metric = Metric::new("model", &["cat", "/proc/device-tree/model"], device_model);
pub const PROCESSES: Metric = Metric::new(
    "processes",
    &["ps", "-eo", "pid,comm,%cpu,%mem", "--sort=-%cpu"],
    top_processes,
);

pub const IP: Metric = Metric::new("ip", &["hostname", "-I"], first_field);
pub const GATEWAY: Metric = Metric::new("gateway", &["ip", "route", "show", "default"], gateway);
pub const OPEN_PORTS: Metric = Metric::new("open_ports", &["ss", "-tuln"], listening_sockets);
pub const FAILED_LOGINS: Metric = Metric::new("failed_logins", &["lastb", "-n", "5"], whole);

pub const CPU_USAGE: Metric = Metric::new("cpu_usage", TOP, cpu_usage);
pub const TEMP: Metric = Metric::new(
    "temp",
    &["cat", "/sys/class/thermal/thermal_zone0/temp"],
    millidegrees,
);
pub const RAM: Metric = Metric::new("ram", FREE, ram_usage);
pub const CPU_CORES: Metric = Metric::new("cpu_cores", &["nproc"], whole);
pub const CPU_FREQ: Metric = Metric::new("cpu_freq", &["lscpu"], cpu_frequencies);

pub const GPIO_VALUES: Metric = Metric::new("values", GPIO_READALL, whole);
pub const GPIO_BOARD: Metric = Metric::new("bcm_board", GPIO_READALL, first_line);

pub const CRITICAL_LOG: Metric = Metric::new(
    "log",
    &["journalctl", "-p", "3", "-xb", "--no-pager"],
    journal_head,
);

pub const USERS: Metric = Metric::new("users", &["cut", "-d:", "-f1", "/etc/passwd"], whole);
pub const GROUPS: Metric = Metric::new("groups", &["cut", "-d:", "-f1", "/etc/group"], whole);

pub const PYTHON3: Metric = Metric::new("python3_version", &["python3", "--version"], non_empty);
pub const PYTHON2: Metric = Metric::new("python2_version", &["python2", "--version"], non_empty);

/// Everything Grid Guardian polls, in one request.
pub const GUARDIAN_DATA: &[Metric] = &[
    OS,
    KERNEL,
    MODEL,
    UPTIME,
    DISK_TOTAL.renamed("total_memory"),
    DISK_USED.renamed("used_memory"),
    DISK_FREE.renamed("free_memory"),
    CPU_USAGE,
    TEMP,
    RAM,
    CPU_CORES,
    CPU_FREQ,
    PYTHON2,
    PYTHON3,
];

pub static DOMAINS: &[Domain] = &[
    Domain {
        name: "storage",
        metrics: &[DISK_TOTAL, DISK_USED, DISK_FREE],
        aggregates: &["get_all"],
    },
    Domain {
        name: "system",
        metrics: &[OS, UPTIME, KERNEL, MODEL],
        aggregates: &["getall"],
    },
    Domain {
        name: "network",
        metrics: &[IP, GATEWAY, OPEN_PORTS, FAILED_LOGINS],
        aggregates: &["getall", "info"],
    },
    Domain {
        name: "hardware",
        metrics: &[CPU_USAGE, TEMP, RAM, CPU_CORES, CPU_FREQ],
        aggregates: &["resources"],
    },
    Domain {
        name: "gpio",
        metrics: &[GPIO_VALUES, GPIO_BOARD],
        aggregates: &["status"],
    },
    Domain {
        name: "events",
        metrics: &[CRITICAL_LOG],
        aggregates: &["critical"],
    },
    Domain {
        name: "security",
        metrics: &[USERS, GROUPS],
        aggregates: &["users"],
    },
];

/// Standalone metrics that belong to no aggregate.
pub static EXTRA: &[(&str, Metric)] = &[("system", PROCESSES)];

pub fn domain(name: &str) -> Option<&'static Domain> {
    DOMAINS.iter().find(|d| d.name == name)
}

/// Look up a single metric served under `domain`.
pub fn lookup(domain: &Domain, name: &str) -> Option<&'static Metric> {
    domain.metric(name).or_else(|| {
        EXTRA
            .iter()
            .find(|(d, m)| *d == domain.name && m.name == name)
            .map(|(_, m)| m)
    })
}

fn whole(output: &str) -> Option<String> {
    Some(output.to_string())
}

fn non_empty(output: &str) -> Option<String> {
    let output = output.trim();
    (!output.is_empty()).then(|| output.to_string())
}

fn first_line(output: &str) -> Option<String> {
    output.lines().next().map(str::to_string)
}

fn first_field(output: &str) -> Option<String> {
    output.split_whitespace().next().map(str::to_string)
}

fn df_column(output: &str, column: usize) -> Option<String> {
    output
        .lines()
        .nth(1)?
        .split_whitespace()
        .nth(column)
        .map(str::to_string)
}

fn df_total(output: &str) -> Option<String> {
    df_column(output, 1)
}

fn df_used(output: &str) -> Option<String> {
    df_column(output, 2)
}

fn df_free(output: &str) -> Option<String> {
    df_column(output, 3)
}

fn os_description(output: &str) -> Option<String> {
    non_empty(output.trim().trim_matches('"'))
}

fn device_model(output: &str) -> Option<String> {
    non_empty(output.trim_end_matches('\0'))
}

fn top_processes(output: &str) -> Option<String> {
    Some(output.lines().take(10).collect::<Vec<_>>().join("\n"))
}

fn gateway(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.starts_with("default"))?
        .split_whitespace()
        .nth(2)
        .map(str::to_string)
}

fn listening_sockets(output: &str) -> Option<String> {
    let sockets: Vec<&str> = output
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(4))
        .collect();
    Some(sockets.join("\n"))
}

// `%Cpu(s):  2.0 us,  1.0 sy, ...` -> user + system
fn cpu_usage(output: &str) -> Option<String> {
    let line = output.lines().find(|line| line.contains("Cpu(s)"))?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    let user: f64 = fields.get(1)?.trim_end_matches(',').parse().ok()?;
    let system: f64 = fields.get(3)?.trim_end_matches(',').parse().ok()?;
    Some(format_number(user + system))
}

fn millidegrees(output: &str) -> Option<String> {
    let raw: f64 = output.trim().parse().ok()?;
    Some(format_number(raw / 1000.0))
}

fn ram_usage(output: &str) -> Option<String> {
    let fields: Vec<&str> = output
        .lines()
        .find(|line| line.starts_with("Mem:"))?
        .split_whitespace()
        .collect();
    Some(format!("{}/{}", fields.get(2)?, fields.get(1)?))
}

fn cpu_frequencies(output: &str) -> Option<String> {
    let values: Vec<&str> = output
        .lines()
        .filter(|line| line.contains("MHz"))
        .filter_map(|line| line.split_whitespace().last())
        .collect();
    Some(values.join("\n"))
}

fn journal_head(output: &str) -> Option<String> {
    Some(output.lines().take(20).collect::<Vec<_>>().join("\n"))
}

fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{}", rounded)
}
