use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gcp_snippets::config::Config;
use gcp_snippets::gcp::auth::GcpCredentials;
use gcp_snippets::gcp::client::{format_gcp_error, Endpoints, GcpClient};
use gcp_snippets::gcp::iam_policy::Policy;
use gcp_snippets::snippets::{
    compute, genai, iam, iot, pubsub, pubsublite, storagetransfer, translate,
};
use gcp_snippets::VERSION;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Google Cloud API snippets
#[derive(Parser, Debug)]
#[command(name = "gcp-snippets", version = VERSION, about, long_about = None)]
struct Cli {
    /// GCP project to use
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Compute Engine zone
    #[arg(short, long, global = true)]
    zone: Option<String>,

    /// Region for regional APIs (IoT, Pub/Sub Lite reservations)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Vertex AI location
    #[arg(long, global = true)]
    location: Option<String>,

    /// Send every request to this base URL instead of the Google API hosts
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Bearer token to use instead of Application Default Credentials
    #[arg(long, global = true)]
    access_token: Option<String>,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute Engine instances
    #[command(subcommand)]
    Compute(ComputeCommand),
    /// IAM roles, service accounts, keys and policies
    #[command(subcommand)]
    Iam(IamCommand),
    /// Pub/Sub topics, subscriptions and schemas
    #[command(subcommand)]
    Pubsub(PubsubCommand),
    /// Pub/Sub Lite reservations, topics and subscriptions
    #[command(subcommand)]
    Pubsublite(LiteCommand),
    /// Cloud IoT device manager (run without arguments for usage)
    Iot {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Storage Transfer Service jobs
    #[command(subcommand)]
    Transfer(TransferCommand),
    /// Cloud Translation
    #[command(subcommand)]
    Translate(TranslateCommand),
    /// Gemini on Vertex AI
    #[command(subcommand)]
    Genai(GenaiCommand),
    /// Show or change saved defaults
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct InstanceArgs {
    /// Instance name
    name: String,
}

#[derive(Subcommand, Debug)]
enum ComputeCommand {
    Create {
        name: String,
        #[arg(long, default_value = "n1-standard-1")]
        machine_type: String,
        #[arg(long, default_value = "projects/debian-cloud/global/images/family/debian-12")]
        image: String,
        #[arg(long, default_value = "global/networks/default")]
        network: String,
    },
    CreateCustom {
        name: String,
        /// custom, n2-custom, n2d-custom, e2-custom, e2-custom-micro|small|medium
        #[arg(long, default_value = "n2-custom")]
        series: String,
        #[arg(long, default_value_t = 2)]
        cores: u32,
        #[arg(long, default_value_t = 8192)]
        memory_mb: u32,
    },
    /// Create from an instance template with a new machine type and an extra disk
    CreateFromTemplate {
        name: String,
        #[arg(long)]
        template: String,
        #[arg(long, default_value = "n1-standard-2")]
        machine_type: String,
        #[arg(long, default_value = "projects/debian-cloud/global/images/family/debian-12")]
        disk_image: String,
    },
    /// Create several instances from a template in one request
    BulkCreate {
        #[arg(long)]
        template: String,
        #[arg(long, default_value_t = 5)]
        count: u32,
        #[arg(long, default_value = "instance-####")]
        name_pattern: String,
    },
    /// Create a Windows Server instance with an internal IP only
    CreateWindows {
        name: String,
        #[arg(long, default_value = "n1-standard-1")]
        machine_type: String,
        #[arg(long, default_value = "windows-2022")]
        image_family: String,
        #[arg(long, default_value = "global/networks/default")]
        network: String,
        /// Defaults to regions/<region>/subnetworks/default
        #[arg(long)]
        subnetwork: Option<String>,
    },
    Get(InstanceArgs),
    List {
        /// List every zone (aggregated)
        #[arg(long)]
        all: bool,
    },
    Start(InstanceArgs),
    Stop(InstanceArgs),
    Reset(InstanceArgs),
    Suspend(InstanceArgs),
    Resume(InstanceArgs),
    Delete(InstanceArgs),
    Wait {
        operation: String,
    },
}

#[derive(Subcommand, Debug)]
enum IamCommand {
    GetRole {
        name: String,
    },
    CreateRole {
        role_id: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "permission", required = true)]
        permissions: Vec<String>,
        #[arg(long, default_value = "GA")]
        stage: String,
    },
    EditRole {
        role_id: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "permission", required = true)]
        permissions: Vec<String>,
        #[arg(long, default_value = "GA")]
        stage: String,
    },
    DisableRole {
        role_id: String,
    },
    ListRoles,
    DeleteRole {
        role_id: String,
    },
    UndeleteRole {
        role_id: String,
    },
    GrantableRoles {
        /// e.g. //cloudresourcemanager.googleapis.com/projects/my-project
        resource: String,
    },
    TestablePermissions {
        resource: String,
    },
    CreateServiceAccount {
        name: String,
        #[arg(long, default_value = "")]
        display_name: String,
    },
    ListServiceAccounts,
    RenameServiceAccount {
        email: String,
        display_name: String,
    },
    DisableServiceAccount {
        email: String,
    },
    EnableServiceAccount {
        email: String,
    },
    DeleteServiceAccount {
        email: String,
    },
    CreateKey {
        email: String,
    },
    ListKeys {
        email: String,
    },
    DeleteKey {
        /// projects/-/serviceAccounts/{email}/keys/{id}
        key_name: String,
    },
    GetPolicy,
    /// Replace the project policy with one read from a JSON file
    SetPolicy {
        file: PathBuf,
    },
    AddBinding {
        member: String,
        role: String,
    },
    AddMember {
        member: String,
        role: String,
    },
    RemoveMember {
        member: String,
        role: String,
    },
    CreateDenyPolicy {
        /// Generated when omitted
        policy_id: Option<String>,
    },
    GetDenyPolicy {
        policy_id: String,
    },
    ListDenyPolicies,
    UpdateDenyPolicy {
        policy_id: String,
        etag: String,
    },
    DeleteDenyPolicy {
        policy_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum PubsubCommand {
    CreateTopic {
        topic: String,
    },
    CreateTopicWithSchema {
        topic: String,
        schema: String,
        #[arg(long, default_value = "JSON")]
        encoding: String,
    },
    ListTopics,
    ListTopicSubscriptions {
        topic: String,
    },
    DeleteTopic {
        topic: String,
    },
    Publish {
        topic: String,
        message: String,
        #[arg(long)]
        ordering_key: Option<String>,
    },
    PublishBatch {
        topic: String,
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    TopicPolicy {
        topic: String,
    },
    AddTopicUsers {
        topic: String,
    },
    TestTopicPermissions {
        topic: String,
    },
    CreatePullSubscription {
        subscription: String,
        topic: String,
    },
    CreatePushSubscription {
        subscription: String,
        topic: String,
        endpoint: String,
    },
    CreateFilteredSubscription {
        subscription: String,
        topic: String,
        filter: String,
    },
    CreateDeadLetterSubscription {
        subscription: String,
        topic: String,
        dead_letter_topic: String,
        #[arg(long, default_value_t = 10)]
        max_delivery_attempts: i32,
    },
    UpdatePushEndpoint {
        subscription: String,
        endpoint: String,
    },
    ListSubscriptions,
    DeleteSubscription {
        subscription: String,
    },
    Pull {
        subscription: String,
        #[arg(long, default_value_t = 10)]
        max_messages: i32,
    },
    SubscriptionPolicy {
        subscription: String,
    },
    AddSubscriptionUsers {
        subscription: String,
    },
    TestSubscriptionPermissions {
        subscription: String,
    },
    CreateAvroSchema {
        schema: String,
        file: PathBuf,
    },
    CreateProtoSchema {
        schema: String,
        file: PathBuf,
    },
    GetSchema {
        schema: String,
    },
    ListSchemas,
    DeleteSchema {
        schema: String,
    },
    CommitAvroSchema {
        schema: String,
        file: PathBuf,
    },
    ListSchemaRevisions {
        schema: String,
    },
    RollbackSchema {
        schema: String,
        revision: String,
    },
}

#[derive(Subcommand, Debug)]
enum LiteCommand {
    CreateReservation {
        reservation: String,
        #[arg(long, default_value_t = 4)]
        capacity: i64,
    },
    GetReservation {
        reservation: String,
    },
    ListReservations,
    UpdateReservation {
        reservation: String,
        capacity: i64,
    },
    DeleteReservation {
        reservation: String,
    },
    ListReservationTopics {
        reservation: String,
    },
    CreateTopic {
        topic: String,
        #[arg(long, default_value = "")]
        reservation: String,
    },
    GetTopic {
        topic: String,
    },
    ListTopics,
    UpdateTopic {
        topic: String,
        #[arg(long, default_value = "")]
        reservation: String,
    },
    DeleteTopic {
        topic: String,
    },
    ListTopicSubscriptions {
        topic: String,
    },
    CreateSubscription {
        topic: String,
        subscription: String,
    },
    CreateExportSubscription {
        topic: String,
        subscription: String,
        pubsub_topic: String,
    },
    GetSubscription {
        subscription: String,
    },
    ListSubscriptions,
    UpdateSubscription {
        subscription: String,
    },
    DeleteSubscription {
        subscription: String,
    },
    Seek {
        subscription: String,
        /// beginning or end
        target: pubsublite::SeekTarget,
        #[arg(long)]
        wait: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TransferCommand {
    Quickstart {
        source_bucket: String,
        sink_bucket: String,
    },
    FromAws {
        source_bucket: String,
        sink_bucket: String,
    },
    FromAzure {
        storage_account: String,
        container: String,
        sink_bucket: String,
    },
    FromS3Compatible {
        agent_pool: String,
        source_bucket: String,
        source_path: String,
        sink_bucket: String,
        gcs_path: String,
    },
    ToNearline {
        source_bucket: String,
        sink_bucket: String,
    },
    Run {
        job: String,
    },
    LatestOperation {
        job: String,
    },
    Delete {
        job: String,
    },
}

#[derive(Subcommand, Debug)]
enum TranslateCommand {
    Text {
        target: String,
        text: String,
        /// Detected when omitted
        #[arg(long, default_value = "")]
        source: String,
    },
    Detect {
        text: String,
    },
    Languages {
        #[arg(long, default_value = "en")]
        display_language: String,
    },
}

#[derive(Args, Debug)]
struct PromptArgs {
    prompt: String,
    #[arg(long, default_value = genai::DEFAULT_MODEL)]
    model: String,
}

#[derive(Subcommand, Debug)]
enum GenaiCommand {
    Text(PromptArgs),
    WithConfig {
        #[command(flatten)]
        prompt: PromptArgs,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        candidate_count: Option<i32>,
        #[arg(long)]
        response_mime_type: Option<String>,
        #[arg(long)]
        max_output_tokens: Option<i32>,
    },
    WithSystem {
        #[command(flatten)]
        prompt: PromptArgs,
        #[arg(long)]
        system: String,
    },
    Stream(PromptArgs),
    CountTokens(PromptArgs),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    SetProject { project: String },
    SetZone { zone: String },
}

/// Effective settings after merging CLI flags with the saved config
struct Settings {
    project: String,
    zone: String,
    region: String,
    location: String,
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled: cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcp-snippets {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcp-snippets").join("gcp-snippets.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcp-snippets").join("gcp-snippets.log");
    }
    PathBuf::from("gcp-snippets.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // Dropped when main returns so the non-blocking writer flushes the log file
    let _guard = setup_logging(cli.log_level);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = run(cli, &mut out).await;
    let _ = out.flush();
    report(result, &mut io::stderr())
}

/// Log a failed command and print its user-facing message
fn report(result: Result<()>, err: &mut dyn Write) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {:#}", e);
            let _ = writeln!(err, "Error: {}", format_gcp_error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, w: &mut dyn Write) -> Result<()> {
    let mut config = Config::load();

    if let Command::Config(cmd) = &cli.command {
        return run_config(w, &mut config, cmd);
    }

    let zone = config.effective_zone(cli.zone.as_deref());
    let settings = Settings {
        project: config.effective_project(cli.project.as_deref()),
        region: config.effective_region(cli.region.as_deref(), &zone),
        location: config.effective_location(cli.location.as_deref()),
        zone,
    };
    if settings.project.is_empty() {
        anyhow::bail!("No project set. Pass --project or run 'gcloud config set project <id>'.");
    }
    tracing::debug!(
        "project={} zone={} region={} location={}",
        settings.project,
        settings.zone,
        settings.region,
        settings.location
    );

    let client = build_client(&cli, &config).await?;

    match cli.command {
        Command::Compute(cmd) => run_compute(w, &client, &settings, cmd).await,
        Command::Iam(cmd) => run_iam(w, &client, &settings, cmd).await,
        Command::Pubsub(cmd) => run_pubsub(w, &client, &settings, cmd).await,
        Command::Pubsublite(cmd) => run_pubsublite(w, &client, &settings, cmd).await,
        Command::Iot { args } => iot::manager::run(w, &client, &settings.project, &args).await,
        Command::Transfer(cmd) => run_transfer(w, &client, &settings, cmd).await,
        Command::Translate(cmd) => run_translate(w, &client, &settings, cmd).await,
        Command::Genai(cmd) => run_genai(w, &client, &settings, cmd).await,
        Command::Config(_) => Ok(()),
    }
}

async fn build_client(cli: &Cli, config: &Config) -> Result<GcpClient> {
    let client = match cli.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(token) => GcpClient::with_credentials(GcpCredentials::from_token(token.trim()))?,
        None => GcpClient::new().await?,
    };

    Ok(match config.effective_endpoint(cli.endpoint.as_deref()) {
        Some(endpoint) => {
            tracing::info!("Routing requests to {}", endpoint);
            client.with_endpoints(Endpoints::with_base_url(&endpoint))
        }
        None => client,
    })
}

fn run_config(w: &mut dyn Write, config: &mut Config, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            if let Some(path) = Config::config_path() {
                writeln!(w, "# {}", path.display())?;
            }
            writeln!(w, "{}", serde_json::to_string_pretty(config)?)?;
        }
        ConfigCommand::SetProject { project } => {
            config.set_project(project)?;
            writeln!(w, "Default project set to {}", project)?;
        }
        ConfigCommand::SetZone { zone } => {
            config.set_zone(zone)?;
            writeln!(w, "Default zone set to {}", zone)?;
        }
    }
    Ok(())
}

async fn run_compute(
    w: &mut dyn Write,
    client: &GcpClient,
    s: &Settings,
    cmd: ComputeCommand,
) -> Result<()> {
    let (project, zone) = (s.project.as_str(), s.zone.as_str());
    match cmd {
        ComputeCommand::Create {
            name,
            machine_type,
            image,
            network,
        } => {
            compute::create_instance(
                w,
                client,
                project,
                zone,
                &name,
                &machine_type,
                &image,
                &network,
            )
            .await
        }
        ComputeCommand::CreateCustom {
            name,
            series,
            cores,
            memory_mb,
        } => {
            let series: compute::CpuSeries = series.parse()?;
            let machine_type = compute::CustomMachineType::new(zone, series, memory_mb, cores)?;
            compute::create_instance_with_custom_machine_type(
                w,
                client,
                project,
                zone,
                &name,
                &machine_type,
            )
            .await
        }
        ComputeCommand::CreateFromTemplate {
            name,
            template,
            machine_type,
            disk_image,
        } => {
            compute::create_instance_from_template_with_overrides(
                w,
                client,
                project,
                zone,
                &name,
                &template,
                &machine_type,
                &disk_image,
            )
            .await
        }
        ComputeCommand::BulkCreate {
            template,
            count,
            name_pattern,
        } => compute::bulk_insert_instances(
            w,
            client,
            project,
            zone,
            &template,
            count,
            &name_pattern,
        )
        .await
        .map(drop),
        ComputeCommand::CreateWindows {
            name,
            machine_type,
            image_family,
            network,
            subnetwork,
        } => {
            let subnetwork = subnetwork
                .unwrap_or_else(|| format!("regions/{}/subnetworks/default", s.region));
            compute::create_windows_server_instance_internal_ip(
                w,
                client,
                project,
                zone,
                &name,
                &machine_type,
                &image_family,
                &network,
                &subnetwork,
            )
            .await
        }
        ComputeCommand::Get(a) => compute::get_instance(w, client, project, zone, &a.name)
            .await
            .map(drop),
        ComputeCommand::List { all: true } => compute::list_all_instances(w, client, project)
            .await
            .map(drop),
        ComputeCommand::List { all: false } => {
            compute::list_instances(w, client, project, zone).await.map(drop)
        }
        ComputeCommand::Start(a) => {
            compute::start_instance(w, client, project, zone, &a.name).await
        }
        ComputeCommand::Stop(a) => compute::stop_instance(w, client, project, zone, &a.name).await,
        ComputeCommand::Reset(a) => {
            compute::reset_instance(w, client, project, zone, &a.name).await
        }
        ComputeCommand::Suspend(a) => {
            compute::suspend_instance(w, client, project, zone, &a.name).await
        }
        ComputeCommand::Resume(a) => {
            compute::resume_instance(w, client, project, zone, &a.name).await
        }
        ComputeCommand::Delete(a) => {
            compute::delete_instance(w, client, project, zone, &a.name).await
        }
        ComputeCommand::Wait { operation } => {
            compute::wait_for_operation(w, client, project, zone, &operation).await
        }
    }
}

async fn run_iam(
    w: &mut dyn Write,
    client: &GcpClient,
    s: &Settings,
    cmd: IamCommand,
) -> Result<()> {
    let project = s.project.as_str();
    match cmd {
        IamCommand::GetRole { name } => iam::get_role(w, client, &name).await.map(drop),
        IamCommand::CreateRole {
            role_id,
            title,
            description,
            permissions,
            stage,
        } => iam::create_role(
            w,
            client,
            &role_id,
            project,
            &title,
            &description,
            &permissions,
            &stage,
        )
        .await
        .map(drop),
        IamCommand::EditRole {
            role_id,
            title,
            description,
            permissions,
            stage,
        } => iam::edit_role(
            w,
            client,
            &role_id,
            project,
            &title,
            &description,
            &permissions,
            &stage,
        )
        .await
        .map(drop),
        IamCommand::DisableRole { role_id } => {
            iam::disable_role(w, client, &role_id, project).await.map(drop)
        }
        IamCommand::ListRoles => iam::list_roles(w, client, project).await.map(drop),
        IamCommand::DeleteRole { role_id } => iam::delete_role(w, client, &role_id, project).await,
        IamCommand::UndeleteRole { role_id } => {
            iam::undelete_role(w, client, &role_id, project).await.map(drop)
        }
        IamCommand::GrantableRoles { resource } => {
            iam::view_grantable_roles(w, client, &resource).await.map(drop)
        }
        IamCommand::TestablePermissions { resource } => {
            iam::query_testable_permissions(w, client, &resource).await.map(drop)
        }
        IamCommand::CreateServiceAccount { name, display_name } => {
            iam::create_service_account(w, client, project, &name, &display_name).await.map(drop)
        }
        IamCommand::ListServiceAccounts => {
            iam::list_service_accounts(w, client, project).await.map(drop)
        }
        IamCommand::RenameServiceAccount { email, display_name } => {
            iam::rename_service_account(w, client, &email, &display_name).await.map(drop)
        }
        IamCommand::DisableServiceAccount { email } => {
            iam::disable_service_account(w, client, &email).await
        }
        IamCommand::EnableServiceAccount { email } => {
            iam::enable_service_account(w, client, &email).await
        }
        IamCommand::DeleteServiceAccount { email } => {
            iam::delete_service_account(w, client, &email).await
        }
        IamCommand::CreateKey { email } => iam::create_key(w, client, &email).await.map(drop),
        IamCommand::ListKeys { email } => iam::list_keys(w, client, &email).await.map(drop),
        IamCommand::DeleteKey { key_name } => iam::delete_key(w, client, &key_name).await,
        IamCommand::GetPolicy => {
            let policy = iam::get_project_policy(w, client, project).await?;
            writeln!(w, "{}", serde_json::to_string_pretty(&policy)?)?;
            Ok(())
        }
        IamCommand::SetPolicy { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let policy: Policy = serde_json::from_str(&content).context("Invalid policy JSON")?;
            iam::set_project_policy(w, client, project, &policy).await.map(drop)
        }
        IamCommand::AddBinding { member, role } => {
            iam::add_binding(w, client, project, &member, &role).await.map(drop)
        }
        IamCommand::AddMember { member, role } => {
            iam::add_member(w, client, project, &member, &role).await.map(drop)
        }
        IamCommand::RemoveMember { member, role } => {
            iam::remove_member(w, client, project, &member, &role).await.map(drop)
        }
        IamCommand::CreateDenyPolicy { policy_id } => {
            let policy_id = policy_id.unwrap_or_else(|| format!("deny-{}", uuid::Uuid::new_v4()));
            iam::create_deny_policy(w, client, project, &policy_id).await.map(drop)
        }
        IamCommand::GetDenyPolicy { policy_id } => {
            iam::get_deny_policy(w, client, project, &policy_id).await.map(drop)
        }
        IamCommand::ListDenyPolicies => iam::list_deny_policies(w, client, project).await.map(drop),
        IamCommand::UpdateDenyPolicy { policy_id, etag } => {
            iam::update_deny_policy(w, client, project, &policy_id, &etag).await.map(drop)
        }
        IamCommand::DeleteDenyPolicy { policy_id } => {
            iam::delete_deny_policy(w, client, project, &policy_id).await
        }
    }
}

async fn run_pubsub(
    w: &mut dyn Write,
    client: &GcpClient,
    s: &Settings,
    cmd: PubsubCommand,
) -> Result<()> {
    let project = s.project.as_str();
    match cmd {
        PubsubCommand::CreateTopic { topic } => {
            pubsub::create_topic(w, client, project, &topic).await.map(drop)
        }
        PubsubCommand::CreateTopicWithSchema {
            topic,
            schema,
            encoding,
        } => pubsub::create_topic_with_schema(w, client, project, &topic, &schema, &encoding)
            .await
            .map(drop),
        PubsubCommand::ListTopics => pubsub::list_topics(w, client, project).await.map(drop),
        PubsubCommand::ListTopicSubscriptions { topic } => {
            pubsub::list_topic_subscriptions(w, client, project, &topic).await.map(drop)
        }
        PubsubCommand::DeleteTopic { topic } => {
            pubsub::delete_topic(w, client, project, &topic).await
        }
        PubsubCommand::Publish {
            topic,
            message,
            ordering_key: Some(key),
        } => pubsub::publish_with_ordering_key(w, client, project, &topic, &message, &key)
            .await
            .map(drop),
        PubsubCommand::Publish {
            topic,
            message,
            ordering_key: None,
        } => pubsub::publish(w, client, project, &topic, &message).await.map(drop),
        PubsubCommand::PublishBatch { topic, count } => {
            pubsub::publish_batch(w, client, project, &topic, count).await.map(drop)
        }
        PubsubCommand::TopicPolicy { topic } => {
            let policy = pubsub::get_topic_policy(w, client, project, &topic).await?;
            writeln!(w, "{}", serde_json::to_string_pretty(&policy)?)?;
            Ok(())
        }
        PubsubCommand::AddTopicUsers { topic } => {
            pubsub::add_topic_users(w, client, project, &topic).await.map(drop)
        }
        PubsubCommand::TestTopicPermissions { topic } => {
            pubsub::test_topic_permissions(w, client, project, &topic).await.map(drop)
        }
        PubsubCommand::CreatePullSubscription { subscription, topic } => {
            pubsub::create_pull_subscription(w, client, project, &subscription, &topic)
                .await
                .map(drop)
        }
        PubsubCommand::CreatePushSubscription {
            subscription,
            topic,
            endpoint,
        } => pubsub::create_push_subscription(w, client, project, &subscription, &topic, &endpoint)
            .await
            .map(drop),
        PubsubCommand::CreateFilteredSubscription {
            subscription,
            topic,
            filter,
        } => pubsub::create_subscription_with_filter(
            w,
            client,
            project,
            &subscription,
            &topic,
            &filter,
        )
        .await
        .map(drop),
        PubsubCommand::CreateDeadLetterSubscription {
            subscription,
            topic,
            dead_letter_topic,
            max_delivery_attempts,
        } => pubsub::create_subscription_with_dead_letter(
            w,
            client,
            project,
            &subscription,
            &topic,
            &dead_letter_topic,
            max_delivery_attempts,
        )
        .await
        .map(drop),
        PubsubCommand::UpdatePushEndpoint {
            subscription,
            endpoint,
        } => pubsub::update_push_endpoint(w, client, project, &subscription, &endpoint)
            .await
            .map(drop),
        PubsubCommand::ListSubscriptions => {
            pubsub::list_subscriptions(w, client, project).await.map(drop)
        }
        PubsubCommand::DeleteSubscription { subscription } => {
            pubsub::delete_subscription(w, client, project, &subscription).await
        }
        PubsubCommand::Pull {
            subscription,
            max_messages,
        } => pubsub::pull_messages(w, client, project, &subscription, max_messages)
            .await
            .map(drop),
        PubsubCommand::SubscriptionPolicy { subscription } => {
            let policy = pubsub::get_subscription_policy(w, client, project, &subscription).await?;
            writeln!(w, "{}", serde_json::to_string_pretty(&policy)?)?;
            Ok(())
        }
        PubsubCommand::AddSubscriptionUsers { subscription } => {
            pubsub::add_subscription_users(w, client, project, &subscription).await.map(drop)
        }
        PubsubCommand::TestSubscriptionPermissions { subscription } => {
            pubsub::test_subscription_permissions(w, client, project, &subscription)
                .await
                .map(drop)
        }
        PubsubCommand::CreateAvroSchema { schema, file } => {
            pubsub::create_avro_schema(w, client, project, &schema, &file).await.map(drop)
        }
        PubsubCommand::CreateProtoSchema { schema, file } => {
            pubsub::create_proto_schema(w, client, project, &schema, &file).await.map(drop)
        }
        PubsubCommand::GetSchema { schema } => {
            pubsub::get_schema(w, client, project, &schema).await.map(drop)
        }
        PubsubCommand::ListSchemas => pubsub::list_schemas(w, client, project).await.map(drop),
        PubsubCommand::DeleteSchema { schema } => {
            pubsub::delete_schema(w, client, project, &schema).await
        }
        PubsubCommand::CommitAvroSchema { schema, file } => {
            pubsub::commit_avro_schema(w, client, project, &schema, &file).await.map(drop)
        }
        PubsubCommand::ListSchemaRevisions { schema } => {
            pubsub::list_schema_revisions(w, client, project, &schema).await.map(drop)
        }
        PubsubCommand::RollbackSchema { schema, revision } => {
            pubsub::rollback_schema(w, client, project, &schema, &revision).await.map(drop)
        }
    }
}

async fn run_pubsublite(
    w: &mut dyn Write,
    client: &GcpClient,
    s: &Settings,
    cmd: LiteCommand,
) -> Result<()> {
    let project = s.project.as_str();
    // Reservations are regional; topics and subscriptions use --zone when one is given.
    let region = s.region.as_str();
    let location = s.zone.as_str();
    match cmd {
        LiteCommand::CreateReservation { reservation, capacity } => {
            pubsublite::create_reservation(w, client, project, region, &reservation, capacity)
                .await
                .map(drop)
        }
        LiteCommand::GetReservation { reservation } => {
            pubsublite::get_reservation(w, client, project, region, &reservation).await.map(drop)
        }
        LiteCommand::ListReservations => {
            pubsublite::list_reservations(w, client, project, region).await.map(drop)
        }
        LiteCommand::UpdateReservation { reservation, capacity } => {
            pubsublite::update_reservation(w, client, project, region, &reservation, capacity)
                .await
                .map(drop)
        }
        LiteCommand::DeleteReservation { reservation } => {
            pubsublite::delete_reservation(w, client, project, region, &reservation).await
        }
        LiteCommand::ListReservationTopics { reservation } => {
            pubsublite::list_topics_in_reservation(w, client, project, region, &reservation)
                .await
                .map(drop)
        }
        LiteCommand::CreateTopic { topic, reservation } => {
            pubsublite::create_lite_topic(w, client, project, location, &topic, &reservation)
                .await
                .map(drop)
        }
        LiteCommand::GetTopic { topic } => {
            pubsublite::get_lite_topic(w, client, project, location, &topic).await.map(drop)
        }
        LiteCommand::ListTopics => {
            pubsublite::list_lite_topics(w, client, project, location).await.map(drop)
        }
        LiteCommand::UpdateTopic { topic, reservation } => {
            pubsublite::update_lite_topic(w, client, project, location, &topic, &reservation)
                .await
                .map(drop)
        }
        LiteCommand::DeleteTopic { topic } => {
            pubsublite::delete_lite_topic(w, client, project, location, &topic).await
        }
        LiteCommand::ListTopicSubscriptions { topic } => {
            pubsublite::list_subscriptions_in_topic(w, client, project, location, &topic)
                .await
                .map(drop)
        }
        LiteCommand::CreateSubscription { topic, subscription } => {
            pubsublite::create_lite_subscription(
                w,
                client,
                project,
                location,
                &topic,
                &subscription,
            )
            .await
            .map(drop)
        }
        LiteCommand::CreateExportSubscription {
            topic,
            subscription,
            pubsub_topic,
        } => pubsublite::create_pubsub_export_subscription(
            w,
            client,
            project,
            location,
            &topic,
            &subscription,
            &pubsub_topic,
        )
        .await
        .map(drop),
        LiteCommand::GetSubscription { subscription } => {
            pubsublite::get_lite_subscription(w, client, project, location, &subscription)
                .await
                .map(drop)
        }
        LiteCommand::ListSubscriptions => {
            pubsublite::list_lite_subscriptions(w, client, project, location).await.map(drop)
        }
        LiteCommand::UpdateSubscription { subscription } => {
            pubsublite::update_lite_subscription(w, client, project, location, &subscription)
                .await
                .map(drop)
        }
        LiteCommand::DeleteSubscription { subscription } => {
            pubsublite::delete_lite_subscription(w, client, project, location, &subscription).await
        }
        LiteCommand::Seek {
            subscription,
            target,
            wait,
        } => pubsublite::seek_subscription(
            w,
            client,
            project,
            location,
            &subscription,
            target,
            wait,
        )
        .await
        .map(drop),
    }
}

async fn run_transfer(
    w: &mut dyn Write,
    client: &GcpClient,
    s: &Settings,
    cmd: TransferCommand,
) -> Result<()> {
    let project = s.project.as_str();
    match cmd {
        TransferCommand::Quickstart {
            source_bucket,
            sink_bucket,
        } => storagetransfer::quickstart(w, client, project, &source_bucket, &sink_bucket)
            .await
            .map(drop),
        TransferCommand::FromAws {
            source_bucket,
            sink_bucket,
        } => storagetransfer::transfer_from_aws(w, client, project, &source_bucket, &sink_bucket)
            .await
            .map(drop),
        TransferCommand::FromAzure {
            storage_account,
            container,
            sink_bucket,
        } => storagetransfer::transfer_from_azure(
            w,
            client,
            project,
            &storage_account,
            &container,
            &sink_bucket,
        )
        .await
        .map(drop),
        TransferCommand::FromS3Compatible {
            agent_pool,
            source_bucket,
            source_path,
            sink_bucket,
            gcs_path,
        } => storagetransfer::transfer_from_s3_compatible(
            w,
            client,
            project,
            &agent_pool,
            &source_bucket,
            &source_path,
            &sink_bucket,
            &gcs_path,
        )
        .await
        .map(drop),
        TransferCommand::ToNearline {
            source_bucket,
            sink_bucket,
        } => storagetransfer::transfer_to_nearline(w, client, project, &source_bucket, &sink_bucket)
            .await
            .map(drop),
        TransferCommand::Run { job } => {
            storagetransfer::run_transfer_job(w, client, project, &job).await
        }
        TransferCommand::LatestOperation { job } => {
            storagetransfer::check_latest_transfer_operation(w, client, project, &job)
                .await
                .map(drop)
        }
        TransferCommand::Delete { job } => {
            storagetransfer::delete_transfer_job(w, client, project, &job).await.map(drop)
        }
    }
}

async fn run_translate(
    w: &mut dyn Write,
    client: &GcpClient,
    s: &Settings,
    cmd: TranslateCommand,
) -> Result<()> {
    let project = s.project.as_str();
    match cmd {
        TranslateCommand::Text {
            target,
            text,
            source,
        } => translate::translate_text(w, client, project, &source, &target, &text)
            .await
            .map(drop),
        TranslateCommand::Detect { text } => {
            translate::detect_language(w, client, project, &text).await.map(drop)
        }
        TranslateCommand::Languages { display_language } => {
            translate::list_supported_languages(w, client, project, &display_language)
                .await
                .map(drop)
        }
    }
}

async fn run_genai(
    w: &mut dyn Write,
    client: &GcpClient,
    s: &Settings,
    cmd: GenaiCommand,
) -> Result<()> {
    let model_ref = |args: &PromptArgs| genai::ModelRef::new(&s.project, &s.location, &args.model);
    match cmd {
        GenaiCommand::Text(args) => {
            genai::generate_with_text(w, client, &model_ref(&args), &args.prompt).await.map(drop)
        }
        GenaiCommand::WithConfig {
            prompt,
            temperature,
            candidate_count,
            response_mime_type,
            max_output_tokens,
        } => {
            let config = genai::GenerationConfig {
                temperature,
                candidate_count,
                response_mime_type,
                max_output_tokens,
            };
            genai::generate_with_config(w, client, &model_ref(&prompt), &prompt.prompt, &config)
                .await
                .map(drop)
        }
        GenaiCommand::WithSystem { prompt, system } => {
            genai::generate_with_system(w, client, &model_ref(&prompt), &system, &prompt.prompt)
                .await
                .map(drop)
        }
        GenaiCommand::Stream(args) => {
            genai::generate_with_text_stream(w, client, &model_ref(&args), &args.prompt)
                .await
                .map(drop)
        }
        GenaiCommand::CountTokens(args) => {
            genai::count_tokens(w, client, &model_ref(&args), &args.prompt).await.map(drop)
        }
    }
}
