//! HTTP-level tests against the full router, each on its own in-memory
//! database.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{spawn_app, ADMIN_EMAIL, ADMIN_PASSWORD, JWT_SECRET};
use farmlands::auth::JwtKeys;
use serde_json::json;

// -- auth ---------------------------------------------------------------------

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app().await;
    let (status, json) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let app = spawn_app().await;
    let (status, json) = app.get("/api/proyectos", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "TOKEN_ERROR");

    let (status, _) = app.get("/api/proyectos", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_issues_24h_token_for_configured_key() {
    let app = spawn_app().await;
    let (status, json) = app
        .post_json(
            "/api/usuario/login",
            None,
            json!({"email": "  ADMIN@farm.test ", "password": ADMIN_PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["user"]["email"], ADMIN_EMAIL);
    assert!(json["data"]["user"].get("password_hash").is_none());

    let token = json["data"]["token"].as_str().unwrap();
    let keys = JwtKeys::new(JWT_SECRET, std::time::Duration::from_secs(24 * 3600));
    let claims = keys.verify(token).unwrap();
    assert_eq!(claims.exp - claims.iat, 24 * 3600);
    assert_eq!(claims.role, "admin");
}

#[tokio::test]
async fn bad_credentials_get_401_without_token() {
    let app = spawn_app().await;

    let (status, json) = app
        .post_json(
            "/api/usuario/login",
            None,
            json!({"email": ADMIN_EMAIL, "password": "wrong-pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "INVALID_PASSWORD");
    assert!(json.get("data").is_none());

    let (status, json) = app
        .post_json(
            "/api/usuario/login",
            None,
            json!({"email": "nobody@farm.test", "password": "whatever"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "USER_NOT_FOUND");

    let (status, json) = app
        .post_json("/api/usuario/login", None, json!({"email": ADMIN_EMAIL}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MISSING_FIELDS");
}

#[tokio::test]
async fn duplicate_registration_names_collided_fields() {
    let app = spawn_app().await;
    app.register_user("ana_g", "ana@farm.test").await;
    let users_before = app.count("users").await;

    let register = |username: &str, email: &str| {
        json!({
            "name": "Ana",
            "lastname": "Gómez",
            "username": username,
            "email": email,
            "password": "secret1"
        })
    };

    let (status, json) = app
        .post_json("/api/usuario/register", None, register("ana_g", "ANA@farm.test"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "USER_AND_EMAIL_EXIST");

    let (_, json) = app
        .post_json("/api/usuario/register", None, register("ana_g", "other@farm.test"))
        .await;
    assert_eq!(json["error"]["code"], "USERNAME_EXISTS");

    let (_, json) = app
        .post_json("/api/usuario/register", None, register("ana_2", "ana@farm.test"))
        .await;
    assert_eq!(json["error"]["code"], "EMAIL_EXISTS");

    assert_eq!(app.count("users").await, users_before);
}

#[tokio::test]
async fn register_validates_fields() {
    let app = spawn_app().await;
    let base = json!({
        "name": "Luis",
        "lastname": "Pérez",
        "username": "luis",
        "email": "luis@farm.test",
        "password": "secret1"
    });

    let mut short = base.clone();
    short["password"] = json!("123");
    let (status, json) = app.post_json("/api/usuario/register", None, short).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_DATA");

    let mut bad_username = base.clone();
    bad_username["username"] = json!("luis perez");
    let (_, json) = app.post_json("/api/usuario/register", None, bad_username).await;
    assert_eq!(json["error"]["code"], "INVALID_USERNAME");

    let mut bad_lastname = base.clone();
    bad_lastname["lastname"] = json!("P3rez");
    let (_, json) = app.post_json("/api/usuario/register", None, bad_lastname).await;
    assert_eq!(json["error"]["code"], "INVALID_LASTNAME");

    let mut bad_email = base.clone();
    bad_email["email"] = json!("luis-at-farm");
    let (_, json) = app.post_json("/api/usuario/register", None, bad_email).await;
    assert_eq!(json["error"]["code"], "INVALID_EMAIL");
}

#[tokio::test]
async fn elevated_role_requires_admin() {
    let app = spawn_app().await;
    let body = json!({
        "name": "Sofía",
        "lastname": "Ruiz",
        "username": "sofia",
        "email": "sofia@farm.test",
        "password": "secret1",
        "role": "supervisor"
    });

    let (status, json) = app.post_json("/api/usuario/register", None, body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "FORBIDDEN");

    let admin = app.admin_token().await;
    let (status, json) = app.post_json("/api/usuario/register", Some(&admin), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["role"], "supervisor");
}

#[tokio::test]
async fn logout_revokes_token() {
    let app = spawn_app().await;
    app.register_user("pedro", "pedro@farm.test").await;
    let token = app.login("pedro@farm.test", "secret1").await;

    let (status, _) = app.get("/api/usuario/listUsers", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app.post_json("/api/usuario/logout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["message"], "Session closed");

    let (status, json) = app.get("/api/usuario/listUsers", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "TOKEN_ERROR");
}

#[tokio::test]
async fn malformed_json_is_invalid_json() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (status, json) = app
        .post_raw("/api/proyectos", Some(&admin), "{not json".into())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_JSON");
}

#[tokio::test]
async fn malformed_query_string_is_invalid_input() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (status, json) = app
        .get("/api/project_data?project_id=abc", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "INVALID_INPUT");

    let (status, json) = app.get("/api/project_data?project_id=7", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!([]));
}

// -- users --------------------------------------------------------------------

#[tokio::test]
async fn users_edit_own_profile_but_not_role() {
    let app = spawn_app().await;
    let id = app.register_user("marta", "marta@farm.test").await;
    let token = app.login("marta@farm.test", "secret1").await;

    let (status, json) = app
        .post_json("/api/usuario/edit", Some(&token), json!({"id": id, "name": "Marta"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["name"], "Marta");
    assert_eq!(json["data"]["lastname"], "Gómez");

    let (status, json) = app
        .post_json("/api/usuario/edit", Some(&token), json!({"id": id, "name": "Marta"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["message"], "No changes made");

    let (status, _) = app
        .post_json("/api/usuario/edit", Some(&token), json!({"id": id, "role": "admin"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post_json("/api/usuario/edit", Some(&token), json!({"id": 1, "name": "Hacker"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn user_search_and_admin_only_delete() {
    let app = spawn_app().await;
    let id = app.register_user("jorge_campo", "jorge@farm.test").await;
    let token = app.login("jorge@farm.test", "secret1").await;

    let (status, json) = app.get("/api/usuario/search?q=CAMPO", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .post_json("/api/usuario/delete", Some(&token), json!({"id": id}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.admin_token().await;
    let (status, _) = app
        .post_json("/api/usuario/delete", Some(&admin), json!({"id": id}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/usuario/listUsers", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn demoted_admin_loses_admin_routes_with_existing_token() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (status, json) = app
        .post_json(
            "/api/usuario/register",
            Some(&admin),
            json!({
                "name": "Bo",
                "lastname": "Lind",
                "username": "bo",
                "email": "bo@farm.test",
                "password": "secret1",
                "role": "admin"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let bo = json["data"]["id"].as_i64().unwrap();
    let bo_token = app.login("bo@farm.test", "secret1").await;
    let victim = app.register_user("lupe", "lupe@farm.test").await;

    let (status, json) = app
        .post_json("/api/usuario/edit", Some(&admin), json!({"id": bo, "role": "user"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");

    let (status, json) = app
        .post_json("/api/usuario/delete", Some(&bo_token), json!({"id": victim}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "FORBIDDEN");
    assert_eq!(app.count("users").await, 3);

    let (status, _) = app.get("/api/usuario/listUsers", Some(&bo_token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn roles_are_listed() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (status, json) = app.get("/api/usuario/roles", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let labels: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["admin", "supervisor", "user"]);
}

// -- projects -----------------------------------------------------------------

#[tokio::test]
async fn create_project_validates_input() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, json) = app
        .post_json(
            "/api/proyectos",
            Some(&admin),
            json!({"descripcion": " ", "fecha_inicio": "2025-01-01", "fecha_cierre": "2025-02-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_INPUT");

    let (status, json) = app
        .post_json(
            "/api/proyectos",
            Some(&admin),
            json!({"descripcion": "Riego", "fecha_inicio": "01/01/2025", "fecha_cierre": "2025-02-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_DATE");

    let id = app.create_project(&admin, "Riego").await;
    let (_, json) = app.get("/api/proyectos", Some(&admin)).await;
    let project = &json["data"][0];
    assert_eq!(project["id"], id);
    assert_eq!(project["estado"], "abierto");
    assert_eq!(project["created_at"].as_str().unwrap().len(), 10);
}

#[tokio::test]
async fn estado_only_update_leaves_other_columns() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let id = app.create_project(&admin, "Siembra de maíz").await;

    let (status, json) = app
        .post_json(
            "/api/proyectos/update",
            Some(&admin),
            json!({"id": id, "estado": "en pausa"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["estado"], "en pausa");
    assert_eq!(data["descripcion"], "Siembra de maíz");
    assert_eq!(data["fecha_inicio"], "2025-03-01");
    assert_eq!(data["fecha_cierre"], "2025-09-30");

    let (status, json) = app
        .post_json(
            "/api/proyectos/update",
            Some(&admin),
            json!({"id": id, "descripcion": "Otra", "estado": "terminado"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_STATE");

    let (_, json) = app.get("/api/proyectos/search?q=ma%C3%ADz", Some(&admin)).await;
    assert_eq!(json["data"][0]["descripcion"], "Siembra de maíz");
    assert_eq!(json["data"][0]["estado"], "en pausa");
}

#[tokio::test]
async fn update_status_requires_fields_and_existing_project() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let id = app.create_project(&admin, "Cosecha").await;

    let (status, json) = app
        .post_json("/api/proyectos/update-status", Some(&admin), json!({"id": id}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MISSING_FIELDS");

    let (status, json) = app
        .post_json(
            "/api/proyectos/update-status",
            Some(&admin),
            json!({"id": 9999, "estado": "cerrado"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "PROJECT_NOT_FOUND");

    let (status, _) = app
        .post_json(
            "/api/proyectos/update-status",
            Some(&admin),
            json!({"id": id, "estado": "cerrado"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_missing_rows_is_not_found() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_project(&admin, "Poda").await;
    let before = app.count("projects").await;

    let (status, json) = app
        .post_json("/api/proyectos/delete", Some(&admin), json!({"id": 4242}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "PROJECT_NOT_FOUND");
    assert_eq!(app.count("projects").await, before);

    let (status, json) = app
        .post_json("/api/tools/delete", Some(&admin), json!({"id": 4242}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "TOOL_NOT_FOUND");

    let (status, json) = app
        .post_json("/api/proyectos/delete", Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MISSING_ID");
}

#[tokio::test]
async fn csv_export_has_header_plus_one_line_per_project() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    for name in ["Siembra", "Riego", "Cosecha"] {
        app.create_project(&admin, name).await;
    }

    let req = Request::builder()
        .uri("/api/proyectos/download")
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let (status, body, headers) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment;filename=proyectos.csv"
    );
    assert_eq!(headers["x-skipped-rows"], "0");

    let text = String::from_utf8(body).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "ID,Descripcion,FechaInicio,FechaCierre,Estado,CreatedAt");
    assert!(lines[1].starts_with("1,Siembra,2025-03-01,2025-09-30,abierto,"));
    assert!(lines[3].starts_with("3,Cosecha,"));
}

// -- memberships --------------------------------------------------------------

#[tokio::test]
async fn assigning_twice_conflicts_and_hides_project_from_available() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let user_id = app.register_user("rosa", "rosa@farm.test").await;
    let assigned = app.create_project(&admin, "Vivero").await;
    let other = app.create_project(&admin, "Huerta").await;

    let body = json!({"user_id": user_id, "project_id": assigned});
    let (status, json) = app
        .post_json("/api/proyectos/asignar", Some(&admin), body.clone())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["role_in_project"], "colaborador");

    let (status, json) = app.post_json("/api/proyectos/asignar", Some(&admin), body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "ALREADY_ASSIGNED");

    let (status, json) = app
        .post_json(
            "/api/proyectos/availableForUser",
            Some(&admin),
            json!({"user_id": user_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![other]);

    let (_, json) = app
        .post_json("/api/proyectos/userProjects", Some(&admin), json!({"user_id": user_id}))
        .await;
    assert_eq!(json["data"][0]["id"], assigned);
    assert_eq!(json["data"][0]["role_in_project"], "colaborador");
}

#[tokio::test]
async fn assign_checks_user_and_project() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let user_id = app.register_user("tomas", "tomas@farm.test").await;
    let project = app.create_project(&admin, "Invernadero").await;

    let (status, json) = app
        .post_json("/api/proyectos/asignar", Some(&admin), json!({"user_id": user_id}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MISSING_FIELDS");

    let (status, json) = app
        .post_json(
            "/api/proyectos/asignar",
            Some(&admin),
            json!({"user_id": 999, "project_id": project}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "USER_NOT_FOUND");

    let (status, json) = app
        .post_json(
            "/api/proyectos/asignar",
            Some(&admin),
            json!({"user_id": user_id, "project_id": 999}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "PROJECT_NOT_FOUND");

    let (_, json) = app
        .post_json("/api/proyectos/availableForUser", Some(&admin), json!({"user_id": 0}))
        .await;
    assert_eq!(json["error"]["code"], "MISSING_FIELDS");
}

#[tokio::test]
async fn memberships_move_and_get_removed() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let user_id = app.register_user("elena", "elena@farm.test").await;
    let first = app.create_project(&admin, "Lote norte").await;
    let second = app.create_project(&admin, "Lote sur").await;

    app.post_json(
        "/api/proyectos/asignar",
        Some(&admin),
        json!({"user_id": user_id, "project_id": first, "role": "lider"}),
    )
    .await;

    let (status, _) = app
        .post_json(
            "/api/proyectos/changeAssociation",
            Some(&admin),
            json!({"user_id": user_id, "old_project_id": first, "new_project_id": second}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app
        .post_json("/api/proyectos/userProjects", Some(&admin), json!({"user_id": user_id}))
        .await;
    assert_eq!(json["data"][0]["id"], second);
    assert_eq!(json["data"][0]["role_in_project"], "lider");

    let (status, json) = app
        .post_json(
            "/api/proyectos/changeAssociation",
            Some(&admin),
            json!({"user_id": user_id, "old_project_id": first, "new_project_id": second}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "ALREADY_ASSIGNED");

    let body = json!({"user_id": user_id, "project_id": second});
    let (status, _) = app
        .post_json("/api/proyectos/removeAssociation", Some(&admin), body.clone())
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = app
        .post_json("/api/proyectos/removeAssociation", Some(&admin), body)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "ASSOCIATION_NOT_FOUND");
}

// -- catalogs -----------------------------------------------------------------

#[tokio::test]
async fn catalog_crud_and_search() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let plow = app.create_catalog_item(&admin, "/api/tools", "Arado de discos").await;
    app.create_catalog_item(&admin, "/api/tools", "Sembradora").await;

    let (_, json) = app.get("/api/tools?q=ARADO", Some(&admin)).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    let (_, json) = app.get("/api/tools", Some(&admin)).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let (status, json) = app
        .post_json(
            "/api/tools/edit",
            Some(&admin),
            json!({"id": plow, "descripcion": "Arado de vertedera"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["descripcion"], "Arado de vertedera");

    let (status, json) = app
        .post_json("/api/farm_tasks", Some(&admin), json!({"descripcion": ""}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_INPUT");

    let (status, json) = app
        .post_json(
            "/api/farm_tasks/edit",
            Some(&admin),
            json!({"id": 77, "descripcion": "Cosecha"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "FARM_TASK_NOT_FOUND");
}

// -- project data -------------------------------------------------------------

struct Fixture {
    admin: String,
    project: i64,
    farm_task: i64,
    tools: Vec<i64>,
}

async fn project_data_fixture(app: &common::TestApp) -> Fixture {
    let admin = app.admin_token().await;
    let project = app.create_project(&admin, "Maíz temporal").await;
    let farm_task = app
        .create_catalog_item(&admin, "/api/farm_tasks", "Fertilización")
        .await;
    let mut tools = Vec::new();
    for name in ["Tractor", "Aspersora", "Rastra", "Remolque"] {
        tools.push(app.create_catalog_item(&admin, "/api/tools", name).await);
    }
    Fixture {
        admin,
        project,
        farm_task,
        tools,
    }
}

async fn linked_tools(app: &common::TestApp, data_id: i64) -> Vec<i64> {
    sqlx::query_scalar(
        "SELECT fk_tools FROM projects_data_tools WHERE fk_projects_data = ?1 ORDER BY fk_tools",
    )
    .bind(data_id)
    .fetch_all(&app.state.db)
    .await
    .unwrap()
}

#[tokio::test]
async fn reconciliation_leaves_exactly_requested_tools() {
    let app = spawn_app().await;
    let fx = project_data_fixture(&app).await;
    let (t1, t2, t3, t4) = (fx.tools[0], fx.tools[1], fx.tools[2], fx.tools[3]);

    let (status, json) = app
        .post_json(
            "/api/project_data",
            Some(&fx.admin),
            json!({
                "actividad": "Abonado",
                "idproject": fx.project,
                "laborAgronomica": fx.farm_task,
                "encargado": 1,
                "equipos": [t3, t1, t2],
                "recursoHumano": 3,
                "costo": 1500.5,
                "observaciones": "Urea"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(linked_tools(&app, id).await, vec![t1, t2, t3]);

    let (status, json) = app
        .post_json(
            "/api/project_data/update",
            Some(&fx.admin),
            json!({"id": id, "equipos": [t2, t3, t4]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["equipos"], json!([t2, t3, t4]));
    assert_eq!(json["data"]["actividad"], "Abonado");
    assert_eq!(linked_tools(&app, id).await, vec![t2, t3, t4]);

    let (_, json) = app
        .post_json(
            "/api/project_data/update",
            Some(&fx.admin),
            json!({"id": id, "costo": 1800}),
        )
        .await;
    assert_eq!(json["data"]["costo"], 1800.0);
    assert_eq!(linked_tools(&app, id).await, vec![t2, t3, t4]);

    let (_, json) = app
        .post_json(
            "/api/project_data/update",
            Some(&fx.admin),
            json!({"id": id, "equipos": []}),
        )
        .await;
    assert_eq!(json["data"]["equipos"], json!([]));
    assert!(linked_tools(&app, id).await.is_empty());
}

#[tokio::test]
async fn failed_reconciliation_rolls_back_scalar_update() {
    let app = spawn_app().await;
    let fx = project_data_fixture(&app).await;
    let (status, json) = app
        .post_json(
            "/api/project_data",
            Some(&fx.admin),
            json!({
                "actividad": "Riego",
                "idproject": fx.project,
                "laborAgronomica": fx.farm_task,
                "encargado": 1,
                "equipos": [fx.tools[0]],
                "recursoHumano": 2,
                "costo": 300
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = app
        .post_json(
            "/api/project_data/update",
            Some(&fx.admin),
            json!({"id": id, "actividad": "Riego por goteo", "equipos": [9999]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_REFERENCE");

    let (_, json) = app
        .get(&format!("/api/project_data?project_id={}", fx.project), Some(&fx.admin))
        .await;
    assert_eq!(json["data"][0]["actividad"], "Riego");
    assert_eq!(json["data"][0]["equipos"], json!([fx.tools[0]]));
}

#[tokio::test]
async fn project_data_create_is_atomic_and_validated() {
    let app = spawn_app().await;
    let fx = project_data_fixture(&app).await;

    let (status, json) = app
        .post_json(
            "/api/project_data",
            Some(&fx.admin),
            json!({"actividad": "Poda", "idproject": fx.project}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_DATA");

    let (status, json) = app
        .post_json(
            "/api/project_data",
            Some(&fx.admin),
            json!({
                "actividad": "Poda",
                "idproject": fx.project,
                "laborAgronomica": fx.farm_task,
                "encargado": 1,
                "equipos": [fx.tools[0], 9999],
                "recursoHumano": 2,
                "costo": 90
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_REFERENCE");
    assert_eq!(app.count("projects_data").await, 0);
    assert_eq!(app.count("projects_data_tools").await, 0);
}

#[tokio::test]
async fn referenced_catalog_rows_cannot_be_deleted() {
    let app = spawn_app().await;
    let fx = project_data_fixture(&app).await;
    let (_, json) = app
        .post_json(
            "/api/project_data",
            Some(&fx.admin),
            json!({
                "actividad": "Rastreo",
                "idproject": fx.project,
                "laborAgronomica": fx.farm_task,
                "encargado": 1,
                "equipos": [fx.tools[2]],
                "recursoHumano": 1,
                "costo": 50
            }),
        )
        .await;
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = app
        .post_json("/api/tools/delete", Some(&fx.admin), json!({"id": fx.tools[2]}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "TOOL_IN_USE");

    let (status, json) = app
        .post_json("/api/farm_tasks/delete", Some(&fx.admin), json!({"id": fx.farm_task}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "FARM_TASK_IN_USE");

    let (status, _) = app
        .post_json("/api/project_data/delete", Some(&fx.admin), json!({"id": id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.count("projects_data_tools").await, 0);

    let (status, _) = app
        .post_json("/api/tools/delete", Some(&fx.admin), json!({"id": fx.tools[2]}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_project_cascades_to_its_records() {
    let app = spawn_app().await;
    let fx = project_data_fixture(&app).await;
    app.post_json(
        "/api/project_data",
        Some(&fx.admin),
        json!({
            "actividad": "Siembra",
            "idproject": fx.project,
            "laborAgronomica": fx.farm_task,
            "encargado": 1,
            "equipos": [fx.tools[0], fx.tools[1]],
            "recursoHumano": 4,
            "costo": 700
        }),
    )
    .await;
    assert_eq!(app.count("projects_data").await, 1);

    let (status, _) = app
        .post_json("/api/proyectos/delete", Some(&fx.admin), json!({"id": fx.project}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.count("projects_data").await, 0);
    assert_eq!(app.count("projects_data_tools").await, 0);
}

#[tokio::test]
async fn users_responsible_for_records_cannot_be_deleted() {
    let app = spawn_app().await;
    let fx = project_data_fixture(&app).await;
    let user = app.register_user("ramiro", "ramiro@farm.test").await;
    let (status, json) = app
        .post_json(
            "/api/project_data",
            Some(&fx.admin),
            json!({
                "actividad": "Riego",
                "idproject": fx.project,
                "laborAgronomica": fx.farm_task,
                "encargado": user,
                "recursoHumano": 2,
                "costo": 120
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");

    let (status, json) = app
        .post_json("/api/usuario/delete", Some(&fx.admin), json!({"id": user}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "USER_IN_USE");
    assert_eq!(app.count("users").await, 2);
    assert_eq!(app.count("projects_data").await, 1);
}

#[tokio::test]
async fn updating_missing_record_is_not_found() {
    let app = spawn_app().await;
    let fx = project_data_fixture(&app).await;
    let (status, json) = app
        .post_json(
            "/api/project_data/update",
            Some(&fx.admin),
            json!({"id": 404, "costo": 10}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "PROJECT_DATA_NOT_FOUND");
}
