//! End-to-end HTTP flows against a served router.
//!
//! Each test spawns its own [`TestApp`], so databases and cookie jars are
//! never shared between tests.

#![allow(clippy::unwrap_used)]

use hocskin_core::Email;
use hocskin_integration_tests::{TestApp, create_user, location};
use hocskin_web::db::{AnalysisRepository, RecommendationRepository, UserRepository};
use reqwest::StatusCode;
use serde_json::Value;

// =============================================================================
// Health and public pages
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.text().await.unwrap(), "ok");

    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_public_pages_render() {
    let app = TestApp::spawn().await;

    for path in ["/", "/about", "/privacy", "/terms", "/live_support", "/contact", "/analyze"] {
        let response = app.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/register",
            &[
                ("username", "ayse"),
                ("email", "ayse@example.com"),
                ("password", "sifre123"),
                ("confirm_password", "baska123"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/register");

    let users = UserRepository::new(&app.pool);
    assert!(users.get_by_username("ayse").await.unwrap().is_none());
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let app = TestApp::spawn().await;
    create_user(&app.pool, "ayse", "ayse@example.com").await;

    let response = app
        .post_form("/login", &[("email", "ayse@example.com"), ("password", "yanlis123")])
        .await;
    assert_eq!(location(&response), "/login");

    // Still anonymous
    let response = app.get("/history").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::spawn().await;
    app.register_and_login("ayse", "ayse@example.com").await;
    assert_eq!(app.get("/profile").await.status(), StatusCode::OK);

    let response = app.post_form("/logout", &[]).await;
    assert_eq!(location(&response), "/");

    assert_eq!(location(&app.get("/profile").await), "/login");
}

// =============================================================================
// Analysis
// =============================================================================

#[tokio::test]
async fn test_member_analysis_is_stored_and_listed() {
    let app = TestApp::spawn().await;
    let user = app.register_and_login("ayse", "ayse@example.com").await;

    let response = app.analyze_upload().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Analiz Sonuçları"));
    assert!(body.contains("25-34"));

    let analyses = AnalysisRepository::new(&app.pool);
    let analysis = analyses.latest_for_user(user.id).await.unwrap().unwrap();
    assert_eq!(analysis.counts.acne, 1);
    assert_eq!(analysis.counts.wrinkle, 2);
    assert!(app.static_dir().join(&analysis.image_path).exists());

    let stored = RecommendationRepository::new(&app.pool)
        .list_for_analysis(analysis.id)
        .await
        .unwrap();
    assert!(!stored.is_empty());

    let history = app.get("/history").await.text().await.unwrap();
    assert!(history.contains("Analiz Geçmişi"));
    assert!(history.contains(&format!("/delete_analysis/{}", analysis.id)));
}

#[tokio::test]
async fn test_anonymous_visitor_gets_one_free_analysis() {
    let app = TestApp::spawn().await;

    let response = app.analyze_upload().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(AnalysisRepository::new(&app.pool).count().await.unwrap(), 0);

    let response = app.analyze_upload().await;
    assert_eq!(location(&response), "/register");
    let page = app.follow(response).await;
    assert!(page.contains("Ücretsiz deneme hakkınızı kullandınız"));
}

#[tokio::test]
async fn test_analysis_without_image_is_bad_request() {
    let app = TestApp::spawn().await;
    app.register_and_login("ayse", "ayse@example.com").await;

    let form = reqwest::multipart::Form::new().text("capturedImage", "");
    let response = app
        .client
        .post(app.url("/analyze"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_owner_can_delete_analysis() {
    let app = TestApp::spawn().await;
    let user = app.register_and_login("ayse", "ayse@example.com").await;
    app.analyze_upload().await;
    let analyses = AnalysisRepository::new(&app.pool);
    let analysis = analyses.latest_for_user(user.id).await.unwrap().unwrap();
    let image = app.static_dir().join(&analysis.image_path);

    let response = app
        .post_form(&format!("/delete_analysis/{}", analysis.id), &[])
        .await;
    assert_eq!(location(&response), "/history");

    assert!(analyses.get_by_id(analysis.id).await.unwrap().is_none());
    assert!(!image.exists());
}

#[tokio::test]
async fn test_other_users_cannot_delete_analysis() {
    let app = TestApp::spawn().await;
    let owner = app.register_and_login("ayse", "ayse@example.com").await;
    app.analyze_upload().await;
    let analyses = AnalysisRepository::new(&app.pool);
    let analysis = analyses.latest_for_user(owner.id).await.unwrap().unwrap();

    let intruder = TestApp::new_client();
    create_user(&app.pool, "mehmet", "mehmet@example.com").await;
    let login = intruder
        .post(app.url("/login"))
        .form(&[("email", "mehmet@example.com"), ("password", "sifre123")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&login), "/");

    let response = intruder
        .post(app.url(&format!("/delete_analysis/{}", analysis.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/history");
    assert!(analyses.get_by_id(analysis.id).await.unwrap().is_some());
}

// =============================================================================
// Profile
// =============================================================================

#[tokio::test]
async fn test_profile_update_sets_base_age() {
    let app = TestApp::spawn().await;
    let user = app.register_and_login("ayse", "ayse@example.com").await;

    let response = app
        .post_form(
            "/update_profile",
            &[("age", "41"), ("gender", "female"), ("skin_type", "dry")],
        )
        .await;
    assert_eq!(location(&response), "/profile");

    let user = UserRepository::new(&app.pool)
        .get_by_id(user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.age, Some(41));
    assert_eq!(user.skin_type.as_deref(), Some("dry"));

    app.analyze_upload().await;
    let analysis = AnalysisRepository::new(&app.pool)
        .latest_for_user(user.id)
        .await
        .unwrap()
        .unwrap();
    assert!((analysis.base_age - 41.0).abs() < f64::EPSILON);
    assert_eq!(analysis.skin_type, "dry");
}

#[tokio::test]
async fn test_profile_update_rejects_bad_age() {
    let app = TestApp::spawn().await;
    let user = app.register_and_login("ayse", "ayse@example.com").await;

    let response = app.post_form("/update_profile", &[("age", "yirmi")]).await;
    let page = app.follow(response).await;
    assert!(page.contains("Geçerli bir yaş girin!"));

    let user = UserRepository::new(&app.pool)
        .get_by_id(user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.age, None);
}

#[tokio::test]
async fn test_edit_profile_rejects_taken_email() {
    let app = TestApp::spawn().await;
    create_user(&app.pool, "mehmet", "mehmet@example.com").await;
    app.register_and_login("ayse", "ayse@example.com").await;

    let response = app
        .post_form(
            "/edit_profile",
            &[("username", "ayse"), ("email", "mehmet@example.com")],
        )
        .await;
    assert_eq!(location(&response), "/edit_profile");

    let users = UserRepository::new(&app.pool);
    let ayse = users.get_by_username("ayse").await.unwrap().unwrap();
    assert_eq!(ayse.email, Email::parse("ayse@example.com").unwrap());
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn test_report_requires_login() {
    let app = TestApp::spawn().await;
    assert_eq!(location(&app.get("/download_report").await), "/login");
}

#[tokio::test]
async fn test_report_without_analysis_redirects_to_analyze() {
    let app = TestApp::spawn().await;
    app.register_and_login("ayse", "ayse@example.com").await;

    let response = app.get("/download_report").await;
    assert_eq!(location(&response), "/analyze");
    assert!(app.follow(response).await.contains("Analiz bulunamadı."));
}

#[tokio::test]
async fn test_report_for_foreign_analysis_redirects_to_history() {
    let app = TestApp::spawn().await;
    let owner = app.register_and_login("mehmet", "mehmet@example.com").await;
    app.analyze_upload().await;
    let analysis = AnalysisRepository::new(&app.pool)
        .latest_for_user(owner.id)
        .await
        .unwrap()
        .unwrap();

    let other = TestApp::new_client();
    create_user(&app.pool, "ayse", "ayse@example.com").await;
    other
        .post(app.url("/login"))
        .form(&[("email", "ayse@example.com"), ("password", "sifre123")])
        .send()
        .await
        .unwrap();

    let response = other
        .get(app.url(&format!("/analyses/{}/report", analysis.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/history");
}

#[tokio::test]
async fn test_report_downloads_as_pdf_attachment() {
    let app = TestApp::spawn().await;
    let user = app.register_and_login("ayse", "ayse@example.com").await;
    app.analyze_upload().await;
    let analysis = AnalysisRepository::new(&app.pool)
        .latest_for_user(user.id)
        .await
        .unwrap()
        .unwrap();

    for path in ["/download_report".to_string(), format!("/analyses/{}/report", analysis.id)] {
        let response = app.get(&path).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert_eq!(response.headers()["content-type"], "application/pdf");
        let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"hocskin_rapor_"));
        assert!(disposition.ends_with(".pdf\""));
        let bytes = response.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    // Served reports are not left behind
    let leftovers = std::fs::read_dir(app.static_dir().join("reports"))
        .unwrap()
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_report_render_failure_flashes_and_redirects() {
    let app = TestApp::spawn_with_config(|config| {
        config.report.font_dir = config.static_dir.join("no-fonts");
    })
    .await;
    app.register_and_login("ayse", "ayse@example.com").await;
    app.analyze_upload().await;

    let response = app.get("/download_report").await;
    assert_eq!(location(&response), "/history");
    assert!(app.follow(response).await.contains("Rapor dosyası oluşturulamadı!"));
}

// =============================================================================
// Chatbot
// =============================================================================

#[tokio::test]
async fn test_chatbot_reports_missing_configuration() {
    let app = TestApp::spawn().await;

    let response = app.client.post(app.url("/initialize")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");

    let response = app
        .client
        .post(app.url("/ask"))
        .json(&serde_json::json!({ "question": "Cilt tipimi nasıl öğrenirim?" }))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Chatbot henüz başlatılmadı.");
}

// =============================================================================
// Contact
// =============================================================================

#[tokio::test]
async fn test_contact_requires_all_fields() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form("/contact", &[("name", "Ayşe"), ("email", "ayse@example.com")])
        .await;
    assert_eq!(location(&response), "/contact");
    assert!(app.follow(response).await.contains("Lütfen tüm alanları doldurun!"));
}

// =============================================================================
// Admin
// =============================================================================

async fn admin_app() -> TestApp {
    let app = TestApp::spawn().await;
    create_user(&app.pool, "yonetici", "admin@example.com").await;
    UserRepository::new(&app.pool)
        .set_admin(&Email::parse("admin@example.com").unwrap(), true)
        .await
        .unwrap();
    app.login("admin@example.com").await;
    app
}

#[tokio::test]
async fn test_admin_requires_login() {
    let app = TestApp::spawn().await;
    assert_eq!(location(&app.get("/admin").await), "/login");
}

#[tokio::test]
async fn test_non_admin_is_sent_home() {
    let app = TestApp::spawn().await;
    app.register_and_login("ayse", "ayse@example.com").await;

    let response = app.get("/admin/users").await;
    assert_eq!(location(&response), "/");
    assert!(app.follow(response).await.contains("Bu sayfaya erişim yetkiniz yok."));
}

#[tokio::test]
async fn test_admin_pages_render() {
    let app = admin_app().await;

    for path in [
        "/admin",
        "/admin/users",
        "/admin/users?search=yon",
        "/admin/analyses",
        "/admin/analyses?date=gecersiz&skin_type=oily",
        "/admin/recommendations",
    ] {
        assert_eq!(app.get(path).await.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn test_admin_adds_recommendation() {
    let app = admin_app().await;

    let response = app
        .post_form(
            "/admin/recommendations/add",
            &[
                ("product_name", "Nemlendirici"),
                ("brand", "Marka"),
                ("product_type", "Krem"),
                ("price_range", "₺150-250"),
                ("target_skin_type", "dry"),
                ("is_active", "on"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/admin/recommendations");

    let page = RecommendationRepository::new(&app.pool).list(1).await.unwrap();
    assert_eq!(page.total, 1);
    let rec = page.items.first().unwrap();
    assert_eq!(rec.product_name, "Nemlendirici");
    assert_eq!(rec.analysis_id, None);
    assert!(rec.targets("dry"));
}

#[tokio::test]
async fn test_admin_rejects_incomplete_recommendation() {
    let app = admin_app().await;

    let response = app
        .post_form("/admin/recommendations/add", &[("product_name", "Nemlendirici")])
        .await;
    assert_eq!(location(&response), "/admin/recommendations");
    assert_eq!(RecommendationRepository::new(&app.pool).count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let app = admin_app().await;
    let users = UserRepository::new(&app.pool);
    let admin = users.get_by_username("yonetici").await.unwrap().unwrap();

    let response = app
        .post_form(&format!("/admin/users/{}/delete", admin.id), &[])
        .await;
    assert!(app.follow(response).await.contains("Kendi hesabınızı silemezsiniz!"));
    assert!(users.get_by_id(admin.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_admin_deletes_user_and_their_analyses() {
    let app = admin_app().await;

    let member = TestApp::new_client();
    let user = create_user(&app.pool, "ayse", "ayse@example.com").await;
    member
        .post(app.url("/login"))
        .form(&[("email", "ayse@example.com"), ("password", "sifre123")])
        .send()
        .await
        .unwrap();
    let part = reqwest::multipart::Part::bytes(hocskin_integration_tests::test_jpeg())
        .file_name("face.jpg")
        .mime_str("image/jpeg")
        .unwrap();
    let response = member
        .post(app.url("/analyze"))
        .multipart(reqwest::multipart::Form::new().part("image", part))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(AnalysisRepository::new(&app.pool).count().await.unwrap(), 1);

    let response = app
        .post_form(&format!("/admin/users/{}/delete", user.id), &[])
        .await;
    assert_eq!(location(&response), "/admin/users");

    assert!(UserRepository::new(&app.pool).get_by_id(user.id).await.unwrap().is_none());
    assert_eq!(AnalysisRepository::new(&app.pool).count().await.unwrap(), 0);
}
