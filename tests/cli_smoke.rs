//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn cli_without_arguments_prints_help() {
    let mut cmd = cargo_bin_cmd!("ibmvpc");
    cmd.assert()
        .failure()
        .stderr(contains("Usage"))
        .stderr(contains("data"));
}

#[test]
fn data_help_lists_every_data_source() {
    let mut cmd = cargo_bin_cmd!("ibmvpc");
    cmd.args(["data", "--help"]);
    cmd.assert()
        .success()
        .stdout(contains("instance-group-managers"))
        .stdout(contains("image-export-job"))
        .stdout(contains("code-engine-function"));
}

#[test]
fn missing_api_key_names_the_environment_variable() {
    let mut cmd = cargo_bin_cmd!("ibmvpc");
    cmd.env_remove("IC_API_KEY");
    cmd.env_remove("IBMVPC_CONFIG_PATH");
    cmd.args(["data", "instance-group-managers", "--instance-group", "group-1"]);

    cmd.assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(contains("IC_API_KEY"))
        .stderr(contains("ibmvpc.toml"));
}

#[test]
fn malformed_binding_id_fails_before_any_request() {
    let mut cmd = cargo_bin_cmd!("ibmvpc");
    cmd.env("IC_API_KEY", "test-key");
    cmd.env("IC_REGION", "eu-de");
    cmd.args(["show", "floating-ip", "server-only"]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains(
            "ibm_is_bare_metal_server_network_interface_floating_ip read",
        ));
}
